//! Output formatting for extraction results

use cppscan_core::{
    DeclarationRecord, ExclusionRecord, Extraction, FileRecords, MarkerRecord, OutputRecord,
};
use eyre::Result;
use owo_colors::{OwoColorize, Style};

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        })
    }
}

/// Styles used by the text renderers; all plain when colour is off
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    color: bool,
}

impl Theme {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    fn pick(&self, style: Style) -> Style {
        if self.color { style } else { Style::new() }
    }

    fn header(&self) -> Style {
        self.pick(Style::new().bold())
    }

    fn dim(&self) -> Style {
        self.pick(Style::new().dimmed())
    }

    fn ok(&self) -> Style {
        self.pick(Style::new().green().bold())
    }

    fn kind(&self) -> Style {
        self.pick(Style::new().blue())
    }

    fn symbol(&self) -> Style {
        self.pick(Style::new().cyan())
    }

    fn marker(&self) -> Style {
        self.pick(Style::new().magenta())
    }

    fn warn(&self) -> Style {
        self.pick(Style::new().yellow())
    }

    fn error(&self) -> Style {
        self.pick(Style::new().red())
    }
}

/// Render an extraction in the specified format
pub fn render(extraction: &Extraction, format: OutputFormat, theme: Theme) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(extraction, theme)),
        OutputFormat::Json => render_json(extraction),
    }
}

fn render_json(extraction: &Extraction) -> Result<String> {
    facet_json::to_string_pretty(extraction)
        .map_err(|e| eyre::eyre!("JSON serialization failed: {e:?}"))
}

fn render_text(extraction: &Extraction, theme: Theme) -> String {
    let mut output = String::new();

    for file in &extraction.files {
        if file.records.is_empty() {
            continue;
        }
        output.push_str(&format!("{}\n", file.file.display().style(theme.header())));
        for record in &file.records {
            output.push_str(&render_record(file, record, theme));
            output.push('\n');
        }
        output.push('\n');
    }

    let exclusions: usize = extraction.files.iter().map(|f| f.exclusions().count()).sum();
    output.push_str(&format!(
        "{} {} declarations, {} markers, {} exclusions in {} files\n",
        "OK".style(theme.ok()),
        extraction.declaration_count(),
        extraction.marker_count(),
        exclusions,
        extraction.files.len()
    ));
    output
}

fn render_record(file: &FileRecords, record: &OutputRecord, theme: Theme) -> String {
    let location = format!("{}:{}", file.file.display(), record.line());
    let body = match record {
        OutputRecord::Declaration(decl) => render_declaration(decl, theme),
        OutputRecord::Marker(marker) => render_marker(marker, theme),
        OutputRecord::Exclusion(exclusion) => render_exclusion(exclusion, theme),
    };
    format!("  {} {}", location.style(theme.dim()), body)
}

fn render_declaration(decl: &DeclarationRecord, theme: Theme) -> String {
    let mut line = format!(
        "{} {}",
        decl.kind.style(theme.kind()),
        decl.qualified_name().style(theme.symbol())
    );

    let lists = [
        ("requirement", &decl.tags.requirement),
        ("requiredby", &decl.tags.requiredby),
        ("version", &decl.tags.version),
        ("testmethods", &decl.tags.testmethods),
        ("defect", &decl.tags.defect),
    ];
    for (name, values) in lists {
        if let Some(values) = values {
            line.push_str(&format!(" {}={}", name.style(theme.dim()), values.join(",")));
        }
    }
    if let Some(brief) = &decl.tags.brief {
        line.push_str(&format!(" {}={:?}", "brief".style(theme.dim()), brief));
    }
    if decl.no_tracing {
        line.push_str(&format!(" {}", "NOTRACING".style(theme.warn())));
    }
    if !decl.invalid_tags.is_empty() {
        line.push_str(&format!(
            " {} {}",
            "invalid:".style(theme.error()),
            decl.invalid_tags.join(",").style(theme.error())
        ));
    }
    line
}

fn render_marker(marker: &MarkerRecord, theme: Theme) -> String {
    let mut line = format!("{} {}", "trace".style(theme.marker()), marker.tags.join(", "));
    push_enclosing(&mut line, marker.enclosing_symbol.as_deref(), theme);
    line
}

fn render_exclusion(exclusion: &ExclusionRecord, theme: Theme) -> String {
    let mut line = format!(
        "{} {:?}",
        "exclude".style(theme.warn()),
        exclusion.justification
    );
    push_enclosing(&mut line, exclusion.enclosing_symbol.as_deref(), theme);
    line
}

fn push_enclosing(line: &mut String, symbol: Option<&str>, theme: Theme) {
    if let Some(symbol) = symbol {
        line.push_str(&format!(
            " {} {}",
            "in".style(theme.dim()),
            symbol.style(theme.symbol())
        ));
    }
}

/// Diagnostics and run warnings, one per line, for stderr
pub fn render_diagnostics(extraction: &Extraction, theme: Theme) -> String {
    let mut output = String::new();

    for warning in &extraction.warnings {
        output.push_str(&format!("{} {}\n", "!".style(theme.warn()), warning));
    }
    for file in &extraction.files {
        for diagnostic in &file.diagnostics {
            output.push_str(&format!(
                "{} {}:{} {} {}\n",
                "-".style(theme.error()),
                file.file.display(),
                diagnostic.line,
                diagnostic.kind.as_str().style(theme.error()),
                diagnostic.detail
            ));
        }
    }
    output
}

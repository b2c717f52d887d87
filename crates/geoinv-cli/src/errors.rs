use console::style;
use geoinv_core::GeoinvError;
use std::fmt;

/// CLI error with fix suggestions
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("\n{context}");
        }

        if !self.suggestions.is_empty() {
            eprintln!("\n{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Map an error to a CliError, attaching suggestions for the failures a
/// user can act on.
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    if let Some(source) = error.downcast_ref::<GeoinvError>() {
        return from_geoinv(source, &error);
    }
    CliError::new(error.to_string())
}

fn from_geoinv(source: &GeoinvError, error: &anyhow::Error) -> CliError {
    let base = CliError::new(error.to_string());
    match source {
        GeoinvError::UnknownProduct { .. } => base
            .with_suggestion("List the driver's products: geoinv inventory --list-products"),
        GeoinvError::UnknownDataset { available, .. } => base
            .with_context(format!("Available datasets: {available}"))
            .with_suggestion("Pass one of the available names with --dataset"),
        GeoinvError::NoProductsRequested => base
            .with_suggestion("Request products with --products <name>...")
            .with_suggestion("See what is defined: geoinv inventory --list-products"),
        GeoinvError::ProjectionMismatch { .. } => base
            .with_suggestion("Drop --nowarp to reproject the inputs")
            .with_suggestion("Or reprocess the offending tile so all inputs share a projection"),
        GeoinvError::EngineFailure { tool, .. } => base
            .with_context(format!("The external raster tool '{tool}' failed."))
            .with_suggestion("Check that the GDAL command-line tools are installed and on PATH"),
        GeoinvError::InvalidDateRange { .. } => {
            base.with_suggestion("Use \"start,end\" with YYYY-MM-DD dates or bare years, e.g. --dates 2010,2015")
        }
        GeoinvError::InvalidDayRange { .. } => {
            base.with_suggestion("Use two days of year in 1..=366, e.g. --days 150,250")
        }
        GeoinvError::FetchFailed { .. } => base
            .with_suggestion("Re-run without --fetch to use only local data"),
        _ => base,
    }
}

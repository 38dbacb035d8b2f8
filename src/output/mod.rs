mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::PhaseProgress;
pub use styling::{dim, magenta_bold};
pub use summary::print_summary;

/// Prints the banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("⏱️  ado-leadtime"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Lead Time to Production for Azure DevOps releases")
    );
}

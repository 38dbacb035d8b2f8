mod client;
mod correlate;
mod fetch;
mod links;
mod provider;
#[cfg(test)]
mod testing;
mod types;

pub use provider::AzureDevOpsProvider;
pub use types::EnvironmentStatus;

use thiserror::Error;

/// Profile configuration errors. Always fatal to the requested operation.
#[derive(Debug, Error)]
pub enum ProfileError {
	#[error("profile name must not be empty")]
	EmptyName,
	#[error("profile {0:?} depends on itself")]
	SelfDependency(String),
	#[error("profile {0:?} is already registered")]
	Duplicate(String),
	#[error("unknown profile {name:?}{}", required_by.as_ref().map(|p| format!(" (required by {p:?})")).unwrap_or_default())]
	UnknownProfile { name: String, required_by: Option<String> },
	#[error("dependency cycle: {}", path.join(" -> "))]
	Cycle { path: Vec<String> },
	#[error("invalid profile document: {0}")]
	Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ProfileError>;

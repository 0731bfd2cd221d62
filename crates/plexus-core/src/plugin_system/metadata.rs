use std::fmt;

/// Static metadata a plugin declares about itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    /// Unique name; no two loaded plugins may share it
    pub name: String,

    /// Plugin version (informational)
    pub version: String,

    /// Plugin description
    pub description: String,

    /// Plugin authors, in declaration order
    pub authors: Vec<String>,

    /// Oldest host version this plugin supports
    pub min_host_version: String,

    /// Names of plugins that must already be loaded
    pub dependencies: Vec<String>,
}

impl PluginMetadata {
    /// Create metadata with no authors and no dependencies
    pub fn new(name: &str, version: &str, min_host_version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            description: String::new(),
            authors: Vec::new(),
            min_host_version: min_host_version.to_string(),
            dependencies: Vec::new(),
        }
    }

    /// Add a dependency, ignoring duplicates
    pub fn add_dependency(&mut self, name: &str) -> &mut Self {
        if !self.dependencies.iter().any(|d| d == name) {
            self.dependencies.push(name.to_string());
        }
        self
    }

    /// Add an author
    pub fn add_author(&mut self, author: &str) -> &mut Self {
        self.authors.push(author.to_string());
        self
    }

    /// Whether `name` is among the declared dependencies
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d == name)
    }
}

impl fmt::Display for PluginMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)?;
        if !self.authors.is_empty() {
            write!(f, " by {}", self.authors.join(", "))?;
        }
        Ok(())
    }
}

/// Builder for creating plugin metadata
pub struct MetadataBuilder {
    metadata: PluginMetadata,
}

impl MetadataBuilder {
    /// Create a new builder. The minimum host version defaults to "0.0.0".
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            metadata: PluginMetadata::new(name, version, "0.0.0"),
        }
    }

    /// Set the plugin description
    pub fn description(mut self, description: &str) -> Self {
        self.metadata.description = description.to_string();
        self
    }

    /// Add an author
    pub fn author(mut self, author: &str) -> Self {
        self.metadata.add_author(author);
        self
    }

    /// Add multiple authors
    pub fn authors(mut self, authors: &[&str]) -> Self {
        for author in authors {
            self.metadata.add_author(author);
        }
        self
    }

    /// Set the minimum supported host version
    pub fn min_host_version(mut self, version: &str) -> Self {
        self.metadata.min_host_version = version.to_string();
        self
    }

    /// Add a dependency on another plugin
    pub fn dependency(mut self, name: &str) -> Self {
        self.metadata.add_dependency(name);
        self
    }

    /// Add multiple dependencies
    pub fn dependencies(mut self, names: &[&str]) -> Self {
        for name in names {
            self.metadata.add_dependency(name);
        }
        self
    }

    /// Build the metadata
    pub fn build(self) -> PluginMetadata {
        self.metadata
    }
}

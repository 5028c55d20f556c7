use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::FaasboxError;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A language that scripts can be written in.
///
/// Each language maps to an interpreter binary, a file extension and a wrapper script that reads
/// the `{code, input}` payload from stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Python 3.
    Python,

    /// JavaScript on Node.js.
    #[serde(rename = "javascript")]
    JavaScript,

    /// TypeScript on tsx.
    #[serde(rename = "typescript")]
    TypeScript,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Language {
    /// Every supported language.
    pub const ALL: [Language; 3] = [Language::Python, Language::JavaScript, Language::TypeScript];

    /// The tag used on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
        }
    }

    /// The interpreter binary that runs the wrapper.
    pub fn interpreter(&self) -> &'static str {
        match self {
            Language::Python => "python3",
            Language::JavaScript => "node",
            Language::TypeScript => "tsx",
        }
    }

    /// The file extension of the wrapper script.
    pub fn extension(&self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::JavaScript => "js",
            Language::TypeScript => "ts",
        }
    }

    /// Whether the interpreter needs `-u` so every line reaches the pipe as soon as it is printed.
    pub fn requires_unbuffered(&self) -> bool {
        matches!(self, Language::Python)
    }

    /// The file name of the wrapper script, e.g. `wrapper.py`.
    pub fn wrapper_file_name(&self) -> String {
        format!("wrapper.{}", self.extension())
    }

    /// Interpreter arguments that precede the wrapper path.
    pub fn interpreter_flags(&self) -> &'static [&'static str] {
        if self.requires_unbuffered() {
            &["-u"]
        } else {
            &[]
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl FromStr for Language {
    type Err = FaasboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" => Ok(Language::Python),
            "javascript" => Ok(Language::JavaScript),
            "typescript" => Ok(Language::TypeScript),
            other => Err(FaasboxError::UnsupportedLanguage(other.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

//! Line oriented preprocessor.
//!
//! Handles `#define` substitution and recursive `#include` expansion and
//! leaves `#line` markers behind so later stages can report diagnostics in
//! the coordinates of the original files. Any other directive is dropped.
use std::{
    collections::HashMap,
    error::Error,
    fmt::Display,
    fs,
    path::Path,
};

use log::debug;

/// Upper bound on distinct macro names. Defines beyond this are silently
/// ignored.
const MAX_DEFINES: usize = 100;

/// Per-line buffer limit. Anything beyond this many bytes on a single line
/// is truncated, not diagnosed.
const MAX_LINE: usize = 1024;

/// Maximum depth of nested includes before expansion is aborted.
const MAX_INCLUDE_DEPTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    IncludeNotFound { file: String, line: usize },
    CircularInclude { path: String, line: usize },
    IncludeTooDeep { line: usize },
    MalformedInclude { line: usize },
}

impl Display for PreprocessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessError::IncludeNotFound { file, line } => {
                write!(f, "could not find included file '{file}' at line {line}")
            }
            PreprocessError::CircularInclude { path, line } => {
                write!(f, "circular include of '{path}' at line {line}")
            }
            PreprocessError::IncludeTooDeep { line } => {
                write!(
                    f,
                    "include depth exceeded maximum ({MAX_INCLUDE_DEPTH}) at line {line}"
                )
            }
            PreprocessError::MalformedInclude { line } => {
                write!(f, "invalid #include directive at line {line}")
            }
        }
    }
}

impl Error for PreprocessError {}

pub type PreprocessResult<T> = Result<T, PreprocessError>;

/// Expand `source` as the contents of `filename`.
pub fn preprocess(source: &str, filename: &str) -> PreprocessResult<String> {
    Preprocessor::new().preprocess(source, filename)
}

/// One open file in the chain of nested includes, linked back to the file
/// that included it. Only used for cycle detection.
struct IncludeFrame<'a> {
    path: &'a str,
    parent: Option<&'a IncludeFrame<'a>>,
}

impl IncludeFrame<'_> {
    fn contains(&self, path: &str) -> bool {
        let mut frame = Some(self);
        while let Some(current) = frame {
            if current.path == path {
                return true;
            }
            frame = current.parent;
        }
        false
    }
}

/// Preprocessing context for a single invocation.
///
/// The define table lives here rather than in module state, so concurrent
/// compilations cannot contaminate each other.
#[derive(Default)]
pub struct Preprocessor {
    defines: HashMap<String, String>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preprocess(&mut self, source: &str, filename: &str) -> PreprocessResult<String> {
        let root = IncludeFrame {
            path: filename,
            parent: None,
        };

        let result = self.preprocess_file(source, filename, &root, 0);

        // The table only lives for one invocation.
        self.defines.clear();

        result
    }

    fn preprocess_file(
        &mut self,
        source: &str,
        filename: &str,
        frame: &IncludeFrame,
        depth: usize,
    ) -> PreprocessResult<String> {
        let mut output = String::with_capacity(source.len() + 64);
        output.push_str(&format!("#line 1 \"{filename}\"\n"));

        for (index, raw_line) in source.lines().enumerate() {
            let line_num = index + 1;
            let line = truncate_line(raw_line);
            let trimmed = line.trim_start();

            if let Some(directive) = trimmed.strip_prefix('#') {
                let directive = directive.trim_start();

                if let Some(rest) = directive.strip_prefix("define") {
                    self.define(rest);
                } else if let Some(rest) = directive.strip_prefix("include") {
                    self.include(rest, filename, frame, depth, line_num, &mut output)?;
                } else {
                    debug!("dropping directive '{trimmed}' at line {line_num}");
                }
                continue;
            }

            self.expand_line(line, &mut output);
            output.push('\n');
        }

        Ok(output)
    }

    /// `#define NAME REPLACEMENT`. Everything after the whitespace that
    /// follows the name becomes the replacement, which may be empty. A later
    /// define of the same name overwrites the earlier one.
    fn define(&mut self, rest: &str) {
        let rest = rest.trim_start();
        let name_len = rest
            .bytes()
            .position(|b| !(b.is_ascii_alphanumeric() || b == b'_'))
            .unwrap_or(rest.len());
        let name = &rest[..name_len];

        if name.is_empty() {
            return;
        }

        if self.defines.len() >= MAX_DEFINES && !self.defines.contains_key(name) {
            debug!("define table full, dropping '{name}'");
            return;
        }

        let replacement = rest[name_len..].trim_start();
        self.defines.insert(name.to_owned(), replacement.to_owned());
    }

    /// `#include "file"` or `#include <file>`. Splices in the recursively
    /// preprocessed contents of the referenced file, then emits a `#line`
    /// marker so diagnostics resume in the including file.
    fn include(
        &mut self,
        rest: &str,
        filename: &str,
        frame: &IncludeFrame,
        depth: usize,
        line: usize,
        output: &mut String,
    ) -> PreprocessResult<()> {
        let rest = rest.trim_start();

        let closer = match rest.bytes().next() {
            Some(b'"') => '"',
            Some(b'<') => '>',
            _ => return Err(PreprocessError::MalformedInclude { line }),
        };

        let operand = &rest[1..];
        let Some(end) = operand.find(closer) else {
            return Err(PreprocessError::MalformedInclude { line });
        };
        let target = &operand[..end];

        if target.is_empty() {
            return Err(PreprocessError::MalformedInclude { line });
        }

        let resolved =
            resolve_include_path(filename, target).ok_or_else(|| PreprocessError::IncludeNotFound {
                file: target.to_owned(),
                line,
            })?;

        if frame.contains(&resolved) {
            return Err(PreprocessError::CircularInclude {
                path: resolved,
                line,
            });
        }

        if depth + 1 >= MAX_INCLUDE_DEPTH {
            return Err(PreprocessError::IncludeTooDeep { line });
        }

        debug!("including '{resolved}' from '{filename}'");

        let content =
            fs::read_to_string(&resolved).map_err(|_| PreprocessError::IncludeNotFound {
                file: resolved.clone(),
                line,
            })?;

        let child = IncludeFrame {
            path: &resolved,
            parent: Some(frame),
        };

        let expanded = self.preprocess_file(&content, &resolved, &child, depth + 1)?;
        output.push_str(&expanded);
        output.push_str(&format!("#line {} \"{filename}\"\n", line + 1));

        Ok(())
    }

    /// Replace every maximal identifier run that names a define with its
    /// replacement text. The replacement is not rescanned.
    fn expand_line(&self, line: &str, output: &mut String) {
        let bytes = line.as_bytes();
        let mut position = 0;

        while position < bytes.len() {
            let start = position;

            if bytes[position].is_ascii_alphabetic() || bytes[position] == b'_' {
                while position < bytes.len()
                    && (bytes[position].is_ascii_alphanumeric() || bytes[position] == b'_')
                {
                    position += 1;
                }

                let ident = &line[start..position];
                match self.defines.get(ident) {
                    Some(replacement) => output.push_str(replacement),
                    None => output.push_str(ident),
                }
            } else {
                while position < bytes.len()
                    && !(bytes[position].is_ascii_alphabetic() || bytes[position] == b'_')
                {
                    position += 1;
                }
                output.push_str(&line[start..position]);
            }
        }
    }
}

/// Resolve an include target, first relative to the directory of the
/// including file, then verbatim against the working directory.
fn resolve_include_path(base_file: &str, target: &str) -> Option<String> {
    if let Some(dir) = Path::new(base_file).parent() {
        let candidate = dir.join(target);
        if candidate.is_file() {
            return Some(candidate.to_string_lossy().into_owned());
        }
    }

    if Path::new(target).is_file() {
        return Some(target.to_owned());
    }

    None
}

fn truncate_line(line: &str) -> &str {
    if line.len() < MAX_LINE {
        return line;
    }

    let mut end = MAX_LINE - 1;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::ShaderError;

const INCLUDE_DIRECTIVE: &str = "#include";

/// Reads `path` and expands `#include "file"` lines, recursively.
///
/// Include paths resolve relative to the including file. Each file is spliced
/// in once, at its first include; later includes of it expand to nothing. A
/// file including itself through its own chain is an error.
pub fn preprocess(path: &Path) -> Result<String, ShaderError> {
    let mut expansion = Expansion::default();
    expansion.expand(path)?;
    Ok(expansion.out)
}

#[derive(Default)]
struct Expansion {
    /// Files currently being expanded, outermost first.
    chain: Vec<PathBuf>,
    /// Every file already spliced in.
    seen: HashSet<PathBuf>,
    out: String,
}

impl Expansion {
    fn expand(&mut self, path: &Path) -> Result<(), ShaderError> {
        let canonical = path.canonicalize().map_err(|e| ShaderError::io(path, &e))?;

        if self.chain.contains(&canonical) {
            let cycle = self
                .chain
                .iter()
                .chain(std::iter::once(&canonical))
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ShaderError::Include {
                path: path.to_path_buf(),
                line: 0,
                message: format!("include cycle: {cycle}"),
            });
        }

        if !self.seen.insert(canonical.clone()) {
            log::trace!("skipping repeated include {}", canonical.display());
            return Ok(());
        }

        let source = fs::read_to_string(&canonical).map_err(|e| ShaderError::io(path, &e))?;
        let dir = canonical.parent().map(Path::to_path_buf).unwrap_or_default();

        self.chain.push(canonical);
        for (index, line) in source.lines().enumerate() {
            let Some(rest) = line.trim_start().strip_prefix(INCLUDE_DIRECTIVE) else {
                self.out.push_str(line);
                self.out.push('\n');
                continue;
            };

            let target = parse_include_target(rest).ok_or_else(|| ShaderError::Include {
                path: path.to_path_buf(),
                line: index + 1,
                message: format!("malformed include directive `{}`", line.trim()),
            })?;

            let included = dir.join(target);
            if !included.is_file() {
                return Err(ShaderError::Include {
                    path: path.to_path_buf(),
                    line: index + 1,
                    message: format!("included file not found: {}", included.display()),
                });
            }
            self.expand(&included)?;
        }
        self.chain.pop();

        Ok(())
    }
}

fn parse_include_target(rest: &str) -> Option<&str> {
    let rest = rest.trim();
    let inner = rest.strip_prefix('"')?.strip_suffix('"')?;
    if inner.is_empty() || inner.contains('"') {
        return None;
    }
    Some(inner)
}

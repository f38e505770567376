use std::{path::Path, sync::LazyLock};

use regex::{Captures, Regex};

use crate::fileset::{FileSetError, FileSets};

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("reference pattern is valid")
});

/// Replaces every `${name}` that names a file set with the set's current
/// contents, shell-quoted and space-separated. Other references are left for
/// the shell.
pub fn expand_command(template: &str, file_sets: &FileSets) -> Result<String, FileSetError> {
    let mut failure = None;

    let expanded = REFERENCE.replace_all(template, |caps: &Captures| {
        let name = &caps[1];
        if !file_sets.contains(name) {
            return caps[0].to_string();
        }

        match file_sets.resolve(name) {
            Ok(paths) => join_quoted(&paths),
            Err(e) => {
                failure.get_or_insert(e);
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(expanded.into_owned()),
    }
}

/// File set names referenced by a template, in order of appearance.
pub fn referenced_file_sets<'a>(template: &'a str, file_sets: &FileSets) -> Vec<&'a str> {
    REFERENCE
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| file_sets.contains(name))
        .collect()
}

fn join_quoted<P: AsRef<Path>>(paths: &[P]) -> String {
    paths
        .iter()
        .map(|p| shell_quote(&p.as_ref().to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '+' | ':' | '@' | ','));

    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

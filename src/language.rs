//! Language hints for mirrors.
//!
//! Uses syntect's bundled Sublime Text syntax definitions to name the
//! language of a file and to pick a file extension for a temp file.

use std::path::Path;
use std::sync::OnceLock;

use syntect::parsing::{SyntaxReference, SyntaxSet};

/// Name of the syntax for a path, by extension or by whole file name.
pub fn language_for_path(path: &Path) -> Option<String> {
    let syntax_set = syntax_set();
    let by_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| syntax_set.find_syntax_by_extension(ext));
    let by_name = || {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| syntax_set.find_syntax_by_extension(name))
    };
    by_extension.or_else(by_name).map(|syntax| syntax.name.clone())
}

/// Name of the syntax suggested by a shebang or mode line.
pub fn language_for_first_line(line: &str) -> Option<String> {
    syntax_set()
        .find_syntax_by_first_line(line)
        .map(|syntax| syntax.name.clone())
}

/// Preferred file extension for a language name or token.
pub fn extension_for_language(language: &str) -> Option<&'static str> {
    find_syntax(language)?
        .file_extensions
        .first()
        .map(String::as_str)
}

fn find_syntax(language: &str) -> Option<&'static SyntaxReference> {
    let syntax_set = syntax_set();
    syntax_set
        .find_syntax_by_token(language)
        .or_else(|| syntax_set.find_syntax_by_name(language))
}

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

//! `gsettings`-backed store for the GNOME app-folders schema.
//!
//! Values cross the process boundary in GVariant text form, so this module
//! carries a small parser/formatter for the two types the schema uses
//! (`s` and `as`).

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use super::{FolderSchema, SettingsStore, StoreError};

pub const APP_FOLDERS_SCHEMA: &str = "org.gnome.desktop.app-folders";
pub const FOLDER_SCHEMA: &str = "org.gnome.desktop.app-folders.folder";
pub const FOLDER_PATH_PREFIX: &str = "/org/gnome/desktop/app-folders/folders/";

#[derive(Debug, Clone)]
struct GsettingsCli {
    bin: PathBuf,
}

impl GsettingsCli {
    fn run(&self, args: &[&str]) -> Result<String, StoreError> {
        let output = Command::new(&self.bin).args(args).output().map_err(|e| {
            StoreError::Command(format!("cannot run {}: {e}", self.bin.display()))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StoreError::Command(format!(
                "{} {} exited with {}: {}",
                self.bin.display(),
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn get(&self, schema: &str, key: &str) -> Result<String, StoreError> {
        self.run(&["get", schema, key]).map_err(|e| StoreError::Read {
            key: key.to_string(),
            detail: e.to_string(),
        })
    }

    fn set(&self, schema: &str, key: &str, value: &str) -> Result<(), StoreError> {
        self.run(&["set", schema, key, value])
            .map(|_| ())
            .map_err(|e| StoreError::Write {
                key: key.to_string(),
                detail: e.to_string(),
            })
    }

    fn get_string(&self, schema: &str, key: &str) -> Result<String, StoreError> {
        let raw = self.get(schema, key)?;
        parse_string(&raw).ok_or(StoreError::Parse {
            key: key.to_string(),
            value: raw,
        })
    }

    fn get_string_list(&self, schema: &str, key: &str) -> Result<Vec<String>, StoreError> {
        let raw = self.get(schema, key)?;
        parse_string_list(&raw).ok_or(StoreError::Parse {
            key: key.to_string(),
            value: raw,
        })
    }
}

/// Store that shells out to the `gsettings` tool.
///
/// `gsettings set` goes through dconf synchronously, so `flush` has
/// nothing left to do.
#[derive(Debug, Clone)]
pub struct GsettingsStore {
    cli: GsettingsCli,
}

impl GsettingsStore {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self {
            cli: GsettingsCli { bin: bin.into() },
        }
    }
}

impl SettingsStore for GsettingsStore {
    fn get_string_list(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.cli.get_string_list(APP_FOLDERS_SCHEMA, key)
    }

    fn set_string_list(&self, key: &str, value: &[String]) -> Result<(), StoreError> {
        self.cli
            .set(APP_FOLDERS_SCHEMA, key, &format_string_list(value))
    }

    fn folder(&self, folder_id: &str) -> Result<Arc<dyn FolderSchema>, StoreError> {
        if folder_id.is_empty() || folder_id.contains('/') {
            return Err(StoreError::Folder {
                folder_id: folder_id.to_string(),
                detail: "folder id is not a valid path component".to_string(),
            });
        }
        Ok(Arc::new(GsettingsFolder {
            cli: self.cli.clone(),
            schema: folder_schema_path(folder_id),
        }))
    }

    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Relocatable schema spec for one folder, `schema:path`.
pub fn folder_schema_path(folder_id: &str) -> String {
    format!("{FOLDER_SCHEMA}:{FOLDER_PATH_PREFIX}{folder_id}/")
}

struct GsettingsFolder {
    cli: GsettingsCli,
    schema: String,
}

impl FolderSchema for GsettingsFolder {
    fn get_string(&self, key: &str) -> Result<String, StoreError> {
        self.cli.get_string(&self.schema, key)
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.cli.set(&self.schema, key, &format_string(value))
    }

    fn get_string_list(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.cli.get_string_list(&self.schema, key)
    }

    fn set_string_list(&self, key: &str, value: &[String]) -> Result<(), StoreError> {
        self.cli
            .set(&self.schema, key, &format_string_list(value))
    }
}

/// Formats a GVariant string literal.
pub fn format_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// Formats a GVariant `as` literal. The empty list carries its type.
pub fn format_string_list(values: &[String]) -> String {
    if values.is_empty() {
        return "@as []".to_string();
    }
    let items: Vec<String> = values.iter().map(|v| format_string(v)).collect();
    format!("[{}]", items.join(", "))
}

/// Parses a GVariant string literal such as `'Games'` or `"Tom's"`.
pub fn parse_string(input: &str) -> Option<String> {
    let mut parser = Parser::new(input.trim());
    parser.skip_annotation("@s");
    let value = parser.string()?;
    parser.skip_ws();
    parser.at_end().then_some(value)
}

/// Parses a GVariant `as` literal such as `['a', 'b']` or `@as []`.
pub fn parse_string_list(input: &str) -> Option<Vec<String>> {
    let mut parser = Parser::new(input.trim());
    parser.skip_annotation("@as");
    parser.expect('[')?;

    let mut items = Vec::new();
    parser.skip_ws();
    if parser.eat(']') {
        parser.skip_ws();
        return parser.at_end().then_some(items);
    }

    loop {
        parser.skip_ws();
        items.push(parser.string()?);
        parser.skip_ws();
        if parser.eat(',') {
            continue;
        }
        parser.expect(']')?;
        break;
    }

    parser.skip_ws();
    parser.at_end().then_some(items)
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn skip_annotation(&mut self, annotation: &str) {
        let rest: String = self.chars.clone().collect();
        if rest.starts_with(annotation) {
            for _ in annotation.chars() {
                self.chars.next();
            }
        }
        self.skip_ws();
    }

    fn eat(&mut self, expected: char) -> bool {
        self.chars.next_if_eq(&expected).is_some()
    }

    fn expect(&mut self, expected: char) -> Option<()> {
        self.eat(expected).then_some(())
    }

    fn at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.chars.next().filter(|c| *c == '\'' || *c == '"')?;
        let mut out = String::new();
        loop {
            match self.chars.next()? {
                '\\' => match self.chars.next()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'u' => out.push(self.unicode_escape(4)?),
                    'U' => out.push(self.unicode_escape(8)?),
                    other => out.push(other),
                },
                c if c == quote => return Some(out),
                c => out.push(c),
            }
        }
    }

    fn unicode_escape(&mut self, digits: usize) -> Option<char> {
        let hex: String = (0..digits).map(|_| self.chars.next()).collect::<Option<_>>()?;
        char::from_u32(u32::from_str_radix(&hex, 16).ok()?)
    }
}

//! Recipe conveniences layered on the file store: `.md` defaulting and the
//! skeleton used for new recipes.

use super::error::StoreResult;
use super::types::FileRecord;
use super::RecipeStore;

/// Append `.md` unless the path already names a markdown file.
pub fn ensure_recipe_suffix(path: &str) -> String {
    if path.ends_with(".md") {
        path.to_string()
    } else {
        format!("{path}.md")
    }
}

/// Human title from a recipe path: `mains/beef-stew_v2.md` -> `Beef Stew V2`.
pub fn title_from_path(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    let stem = name.strip_suffix(".md").unwrap_or(name);
    stem.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn recipe_template(title: &str) -> String {
    format!("# {title}\n\n## Ingredients\n\n- \n\n## Instructions\n\n1. \n\n## Notes\n\n")
}

impl RecipeStore {
    /// Create a recipe from the template. Refuses to replace an existing one.
    pub fn create_recipe(&self, path: &str) -> StoreResult<FileRecord> {
        let path = ensure_recipe_suffix(path);
        let content = recipe_template(&title_from_path(&path));
        self.create(&path, &content)
    }
}

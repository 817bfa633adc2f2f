//! Turns the server's pre-rendered listing HTML into plain entries the
//! UI can draw. The server owns presentation; this side only needs the
//! recipe anchors and the tag chips out of it.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid anchor selector"));
static TAG_CHIP: Lazy<Selector> = Lazy::new(|| Selector::parse(".tag").expect("valid tag selector"));

const RECIPE_PREFIX: &str = "/recipes/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeEntry {
    pub name: String,
    pub href: String,
}

#[derive(Debug, Clone, Default)]
pub struct HomePage {
    pub recipes: Vec<RecipeEntry>,
    pub tags: Vec<String>,
}

/// Parse the fragment `/find` returns: whatever recipe anchors it holds,
/// in document order.
pub fn parse_results_fragment(html: &str) -> Vec<RecipeEntry> {
    collect_recipes(&Html::parse_fragment(html))
}

/// Parse the full home page: the initial recipe listing plus the tag
/// strip rendered next to the search form.
pub fn parse_home_page(html: &str) -> HomePage {
    let document = Html::parse_document(html);
    HomePage {
        recipes: collect_recipes(&document),
        tags: collect_tags(&document),
    }
}

fn collect_recipes(document: &Html) -> Vec<RecipeEntry> {
    let mut entries = Vec::new();
    for anchor in document.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.starts_with(RECIPE_PREFIX) {
            continue;
        }
        let name = normalize_text(anchor.text());
        if name.is_empty() {
            continue;
        }
        entries.push(RecipeEntry {
            name,
            href: href.to_string(),
        });
    }
    entries
}

fn collect_tags(document: &Html) -> Vec<String> {
    let mut tags = Vec::new();
    for chip in document.select(&TAG_CHIP) {
        let name = normalize_text(chip.text());
        if !name.is_empty() && !tags.contains(&name) {
            tags.push(name);
        }
    }
    tags
}

fn normalize_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_anchors_become_entries_in_order() {
        let fragment = r#"
            <div class="card"><a href="/recipes/apple_pie">Apple Pie</a></div>
            <div class="card"><a href="/recipes/beef_stew">
                Beef
                Stew
            </a></div>
        "#;
        let entries = parse_results_fragment(fragment);
        assert_eq!(
            entries,
            vec![
                RecipeEntry {
                    name: "Apple Pie".into(),
                    href: "/recipes/apple_pie".into(),
                },
                RecipeEntry {
                    name: "Beef Stew".into(),
                    href: "/recipes/beef_stew".into(),
                },
            ]
        );
    }

    #[test]
    fn non_recipe_anchors_are_skipped() {
        let fragment = r#"
            <a href="/grid">Grid view</a>
            <a href="https://example.com">Elsewhere</a>
            <a href="/recipes/flatbread">Flatbread</a>
        "#;
        let entries = parse_results_fragment(fragment);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Flatbread");
    }

    #[test]
    fn empty_fragment_yields_no_entries() {
        assert!(parse_results_fragment("<p>No recipes found</p>").is_empty());
    }

    #[test]
    fn home_page_collects_recipes_and_deduplicated_tags() {
        let page = r#"
            <html><body>
              <form id="searchForm"><input id="search" name="search"></form>
              <span class="tag is-primary">Dinner</span>
              <span class="tag is-primary">Dessert</span>
              <span class="tag is-primary">Dinner</span>
              <div id="recipes">
                <a href="/recipes/apple_pie">Apple Pie</a>
              </div>
            </body></html>
        "#;
        let home = parse_home_page(page);
        assert_eq!(home.tags, vec!["Dinner".to_string(), "Dessert".to_string()]);
        assert_eq!(home.recipes.len(), 1);
        assert_eq!(home.recipes[0].href, "/recipes/apple_pie");
    }
}

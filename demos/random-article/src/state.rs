//! Screen state for the article reader

use serde::{Deserialize, Serialize};

/// A random encyclopedia article.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub extract: String,
    /// Lead image URL, when the article has one
    pub image: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WikiState {
    /// Article on screen. Cleared while a new one is loading.
    pub article: Option<Article>,
    pub loading: bool,
    pub error: Option<String>,
    /// Fetches that finished, successfully or not
    pub completed: u32,
}

impl WikiState {
    /// One-line rendering for the terminal.
    pub fn render(&self) -> String {
        match (&self.article, &self.error) {
            _ if self.loading => "loading...".to_string(),
            (Some(article), _) => {
                let image = article.image.as_deref().unwrap_or("no image");
                format!("{} [{}]\n  {}", article.title, image, article.extract)
            }
            (None, Some(error)) => format!("error: {error}"),
            (None, None) => "nothing loaded yet".to_string(),
        }
    }
}

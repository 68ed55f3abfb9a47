//! Reader actions
//!
//! `FetchRandomArticle` is the intent; `ArticleDidLoad` and `ArticleDidFail`
//! carry the outcome back from the fetch side effect.

use crate::state::Article;

#[derive(uni_dispatch::Action, Clone, Debug, PartialEq)]
pub enum WikiAction {
    /// Intent: show a new random article
    FetchRandomArticle,

    /// Result: the service returned an article
    ArticleDidLoad(Article),

    /// Result: the service call failed
    ArticleDidFail(String),
}

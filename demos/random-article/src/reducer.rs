use crate::action::WikiAction;
use crate::state::WikiState;

pub fn reducer(state: &WikiState, action: &WikiAction) -> WikiState {
    match action {
        WikiAction::FetchRandomArticle => WikiState {
            article: None,
            loading: true,
            error: None,
            ..state.clone()
        },
        WikiAction::ArticleDidLoad(article) => WikiState {
            article: Some(article.clone()),
            loading: false,
            error: None,
            completed: state.completed + 1,
        },
        WikiAction::ArticleDidFail(error) => WikiState {
            article: None,
            loading: false,
            error: Some(error.clone()),
            completed: state.completed + 1,
        },
    }
}

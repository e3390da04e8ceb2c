use async_trait::async_trait;
use url::Url;

use crate::error::ScrapeError;

/// What the scraper needs from a rendered page. Extraction and pagination only ever
/// talk to this trait; the WebDriver binding lives in `browser`.
///
/// Lookups that match nothing are `Ok(None)` / an empty `Vec`, not errors.
#[async_trait]
pub trait Page: Send + Sync {
    type Node: Clone + Send + Sync;

    async fn goto(&self, url: &Url) -> Result<(), ScrapeError>;

    async fn find_all(&self, selector: &str) -> Result<Vec<Self::Node>, ScrapeError>;

    async fn find_all_in(
        &self,
        node: &Self::Node,
        selector: &str,
    ) -> Result<Vec<Self::Node>, ScrapeError>;

    async fn is_visible(&self, node: &Self::Node) -> Result<bool, ScrapeError>;

    async fn click(&self, node: &Self::Node) -> Result<(), ScrapeError>;

    async fn text_of(&self, node: &Self::Node) -> Result<String, ScrapeError>;

    async fn attribute_of(
        &self,
        node: &Self::Node,
        name: &str,
    ) -> Result<Option<String>, ScrapeError>;

    async fn find_one(&self, selector: &str) -> Result<Option<Self::Node>, ScrapeError> {
        Ok(self.find_all(selector).await?.into_iter().next())
    }

    async fn find_one_in(
        &self,
        node: &Self::Node,
        selector: &str,
    ) -> Result<Option<Self::Node>, ScrapeError> {
        Ok(self.find_all_in(node, selector).await?.into_iter().next())
    }
}

#[cfg(test)]
pub mod fake {
    //! In-memory page: a flat table of `(scope, selector) -> nodes`.

    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use super::*;
    use crate::settings::Selectors;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FakeNode(pub usize);

    /// One product card as the site would render it. `None` leaves the node out.
    #[derive(Debug, Clone, Default)]
    pub struct Card {
        pub title: Option<String>,
        pub description: Option<String>,
        pub price: Option<String>,
        pub stars: usize,
        pub reviews: Option<String>,
    }

    impl Card {
        pub fn new(title: &str, description: &str, price: &str, stars: usize, reviews: &str) -> Self {
            Self {
                title: Some(title.to_string()),
                description: Some(description.to_string()),
                price: Some(price.to_string()),
                stars,
                reviews: Some(reviews.to_string()),
            }
        }
    }

    struct LoadMore {
        selector: String,
        node: usize,
        remaining: usize,
    }

    #[derive(Default)]
    struct State {
        next_id: usize,
        matches: HashMap<(Option<usize>, String), Vec<usize>>,
        texts: HashMap<usize, String>,
        attrs: HashMap<(usize, String), String>,
        hidden: HashSet<usize>,
        clicks: HashMap<usize, usize>,
        load_more: Option<LoadMore>,
        visited: Vec<String>,
        failing_navigations: usize,
    }

    impl State {
        fn node(&mut self, scope: Option<usize>, selector: &str) -> usize {
            let id = self.next_id;
            self.next_id += 1;
            self.matches
                .entry((scope, selector.to_string()))
                .or_default()
                .push(id);
            id
        }
    }

    #[derive(Default)]
    pub struct FakePage {
        state: Mutex<State>,
    }

    impl FakePage {
        pub fn new() -> Self {
            Self::default()
        }

        fn state(&self) -> std::sync::MutexGuard<'_, State> {
            self.state.lock().unwrap()
        }

        pub fn add_node(&self, selector: &str, text: &str) -> FakeNode {
            let mut st = self.state();
            let id = st.node(None, selector);
            st.texts.insert(id, text.to_string());
            FakeNode(id)
        }

        pub fn hide(&self, node: FakeNode) {
            self.state().hidden.insert(node.0);
        }

        /// A load-more control that disappears after `clicks` activations.
        pub fn with_load_more(&self, selector: &str, clicks: usize) -> FakeNode {
            let mut st = self.state();
            let id = st.node(None, selector);
            st.load_more = Some(LoadMore {
                selector: selector.to_string(),
                node: id,
                remaining: clicks,
            });
            FakeNode(id)
        }

        pub fn fail_navigations(&self, count: usize) {
            self.state().failing_navigations = count;
        }

        pub fn add_card(&self, sel: &Selectors, card: &Card) -> FakeNode {
            let mut st = self.state();
            let root = st.node(None, &sel.listing);
            if let Some(title) = &card.title {
                let id = st.node(Some(root), &sel.title);
                st.attrs
                    .insert((id, sel.title_attribute.clone()), title.clone());
                st.texts.insert(id, title.chars().take(12).collect());
            }
            if let Some(desc) = &card.description {
                let id = st.node(Some(root), &sel.description);
                st.texts.insert(id, desc.clone());
            }
            if let Some(price) = &card.price {
                let id = st.node(Some(root), &sel.price);
                st.texts.insert(id, price.clone());
            }
            for _ in 0..card.stars {
                st.node(Some(root), &sel.rating_marker);
            }
            if let Some(reviews) = &card.reviews {
                let id = st.node(Some(root), &sel.review_count);
                st.texts.insert(id, reviews.clone());
            }
            FakeNode(root)
        }

        pub fn clicks_on(&self, node: FakeNode) -> usize {
            self.state().clicks.get(&node.0).copied().unwrap_or(0)
        }

        pub fn visited(&self) -> Vec<String> {
            self.state().visited.clone()
        }

        fn lookup(&self, scope: Option<usize>, selector: &str) -> Vec<FakeNode> {
            self.state()
                .matches
                .get(&(scope, selector.to_string()))
                .map(|ids| ids.iter().copied().map(FakeNode).collect())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl Page for FakePage {
        type Node = FakeNode;

        async fn goto(&self, url: &Url) -> Result<(), ScrapeError> {
            let mut st = self.state();
            st.visited.push(url.to_string());
            if st.failing_navigations > 0 {
                st.failing_navigations -= 1;
                return Err(ScrapeError::Navigation {
                    url: url.to_string(),
                    reason: "connection refused".into(),
                });
            }
            Ok(())
        }

        async fn find_all(&self, selector: &str) -> Result<Vec<FakeNode>, ScrapeError> {
            Ok(self.lookup(None, selector))
        }

        async fn find_all_in(
            &self,
            node: &FakeNode,
            selector: &str,
        ) -> Result<Vec<FakeNode>, ScrapeError> {
            Ok(self.lookup(Some(node.0), selector))
        }

        async fn is_visible(&self, node: &FakeNode) -> Result<bool, ScrapeError> {
            Ok(!self.state().hidden.contains(&node.0))
        }

        async fn click(&self, node: &FakeNode) -> Result<(), ScrapeError> {
            let mut st = self.state();
            *st.clicks.entry(node.0).or_default() += 1;

            let mut exhausted = None;
            if let Some(lm) = st.load_more.as_mut().filter(|lm| lm.node == node.0) {
                lm.remaining = lm.remaining.saturating_sub(1);
                if lm.remaining == 0 {
                    exhausted = Some((lm.selector.clone(), lm.node));
                }
            }
            if let Some((selector, id)) = exhausted {
                if let Some(ids) = st.matches.get_mut(&(None, selector)) {
                    ids.retain(|n| *n != id);
                }
                st.load_more = None;
            }
            Ok(())
        }

        async fn text_of(&self, node: &FakeNode) -> Result<String, ScrapeError> {
            Ok(self.state().texts.get(&node.0).cloned().unwrap_or_default())
        }

        async fn attribute_of(
            &self,
            node: &FakeNode,
            name: &str,
        ) -> Result<Option<String>, ScrapeError> {
            Ok(self.state().attrs.get(&(node.0, name.to_string())).cloned())
        }
    }
}

use shared::domain::{Article, ArticleId};

/// Ordered article list with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleCollection {
    items: Vec<Article>,
}

impl ArticleCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from a server listing. A repeated id keeps the
    /// position of its first occurrence and the value of its last.
    pub fn from_articles(articles: impl IntoIterator<Item = Article>) -> Self {
        let mut collection = Self::new();
        for article in articles {
            collection.upsert(article);
        }
        collection
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Article> {
        self.items.iter()
    }

    pub fn get(&self, id: ArticleId) -> Option<&Article> {
        self.items.iter().find(|article| article.article_id == id)
    }

    pub fn contains(&self, id: ArticleId) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: ArticleId) -> Option<usize> {
        self.items.iter().position(|article| article.article_id == id)
    }

    /// Replaces the element with the same id in place, or appends.
    pub fn upsert(&mut self, article: Article) {
        match self.position(article.article_id) {
            Some(index) => self.items[index] = article,
            None => self.items.push(article),
        }
    }

    /// Swaps the element `id` for `article`, keeping its slot. The server may
    /// hand back a different id; any element already holding that id is
    /// dropped first.
    pub fn replace(&mut self, id: ArticleId, article: Article) {
        if article.article_id != id {
            self.remove(article.article_id);
        }
        match self.position(id) {
            Some(index) => self.items[index] = article,
            None => self.items.push(article),
        }
    }

    pub fn remove(&mut self, id: ArticleId) -> Option<Article> {
        let index = self.position(id)?;
        Some(self.items.remove(index))
    }
}

impl<'a> IntoIterator for &'a ArticleCollection {
    type Item = &'a Article;
    type IntoIter = std::slice::Iter<'a, Article>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use shared::domain::Topic;

    use super::*;

    fn article(id: i64, title: &str) -> Article {
        Article {
            article_id: ArticleId(id),
            title: title.to_string(),
            text: format!("{title} body"),
            topic: Topic::React,
        }
    }

    fn ids(collection: &ArticleCollection) -> Vec<i64> {
        collection.iter().map(|a| a.article_id.0).collect()
    }

    fn assert_unique(collection: &ArticleCollection) {
        let unique: HashSet<_> = collection.iter().map(|a| a.article_id).collect();
        assert_eq!(unique.len(), collection.len(), "duplicate ids: {:?}", ids(collection));
    }

    #[test]
    fn listing_with_repeated_ids_is_deduplicated() {
        let collection = ArticleCollection::from_articles(vec![
            article(1, "a"),
            article(2, "b"),
            article(1, "a2"),
        ]);
        assert_eq!(ids(&collection), vec![1, 2]);
        assert_eq!(collection.get(ArticleId(1)).map(|a| a.title.as_str()), Some("a2"));
    }

    #[test]
    fn replace_keeps_slot_and_drops_conflicting_id() {
        let mut collection =
            ArticleCollection::from_articles(vec![article(1, "a"), article(2, "b"), article(3, "c")]);

        collection.replace(ArticleId(2), article(2, "b2"));
        assert_eq!(ids(&collection), vec![1, 2, 3]);
        assert_eq!(collection.get(ArticleId(2)).map(|a| a.title.as_str()), Some("b2"));

        collection.replace(ArticleId(1), article(3, "moved"));
        assert_eq!(ids(&collection), vec![3, 2]);
        assert_eq!(collection.get(ArticleId(3)).map(|a| a.title.as_str()), Some("moved"));
        assert_unique(&collection);
    }

    #[test]
    fn replace_of_missing_id_appends() {
        let mut collection = ArticleCollection::from_articles(vec![article(1, "a")]);
        collection.replace(ArticleId(9), article(9, "new"));
        assert_eq!(ids(&collection), vec![1, 9]);
    }

    #[test]
    fn mixed_mutation_sequence_keeps_ids_unique() {
        let mut collection = ArticleCollection::new();
        for step in 0..40_i64 {
            let id = step % 7;
            match step % 4 {
                0 => collection.upsert(article(id, "created")),
                1 => collection.replace(ArticleId(id), article((id + 3) % 7, "updated")),
                2 => {
                    collection.remove(ArticleId(id));
                }
                _ => collection.upsert(article((id * 5) % 7, "again")),
            }
            assert_unique(&collection);
        }
    }

    #[test]
    fn remove_reports_whether_anything_went() {
        let mut collection = ArticleCollection::from_articles(vec![article(1, "a")]);
        assert!(collection.remove(ArticleId(2)).is_none());
        assert!(collection.remove(ArticleId(1)).is_some());
        assert!(collection.is_empty());
    }
}

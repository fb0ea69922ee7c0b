use ab_core::{ArticleRecord, InsertOutcome};

/// Number of records kept in the main index.
pub const DEFAULT_CAP: usize = 50;

/// The main article list, newest first, bounded by `cap`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleIndex {
    articles: Vec<ArticleRecord>,
    cap: usize,
}

impl ArticleIndex {
    pub fn new(articles: Vec<ArticleRecord>, cap: usize) -> Self {
        Self {
            articles,
            cap: cap.max(1),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn articles(&self) -> &[ArticleRecord] {
        &self.articles
    }

    pub fn into_articles(self) -> Vec<ArticleRecord> {
        self.articles
    }

    /// Drops records with the same title, puts `record` at position 0 and
    /// splits off everything past the cap.
    pub fn insert(&mut self, record: ArticleRecord) -> InsertOutcome {
        let before = self.articles.len();
        self.articles.retain(|a| a.title != record.title);
        let replaced = self.articles.len() != before;

        self.articles.insert(0, record);
        let archived = if self.articles.len() > self.cap {
            self.articles.split_off(self.cap)
        } else {
            Vec::new()
        };

        InsertOutcome {
            replaced,
            archived,
            total: self.articles.len(),
        }
    }
}

/// Prepends overflow records, newest first. An archived record with the same
/// title as an overflow record is replaced by it. Returns how many were added.
pub fn merge_into_archive(archive: &mut Vec<ArticleRecord>, overflow: Vec<ArticleRecord>) -> usize {
    archive.retain(|a| !overflow.iter().any(|b| b.title == a.title));
    let added = overflow.len();
    archive.splice(0..0, overflow);
    added
}

/// Removes an archived copy of `title`. Called when the title is published again.
pub fn withdraw_from_archive(archive: &mut Vec<ArticleRecord>, title: &str) -> bool {
    let before = archive.len();
    archive.retain(|a| a.title != title);
    archive.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(n: usize) -> Vec<ArticleRecord> {
        (0..n).map(|i| ArticleRecord::new(format!("Article {}", i))).collect()
    }

    #[test]
    fn test_insert_replaces_same_title() {
        let mut index = ArticleIndex::new(titled(3), DEFAULT_CAP);
        let mut updated = ArticleRecord::new("Article 2");
        updated.summary = "rewritten".to_string();

        let outcome = index.insert(updated);
        assert!(outcome.replaced);
        assert_eq!(outcome.total, 3);
        assert_eq!(index.articles()[0].title, "Article 2");
        assert_eq!(index.articles()[0].summary, "rewritten");
        assert_eq!(
            index.articles().iter().filter(|a| a.title == "Article 2").count(),
            1
        );
    }

    #[test]
    fn test_insert_caps_and_archives_tail() {
        let existing = titled(DEFAULT_CAP);
        let tail = existing[DEFAULT_CAP - 1].clone();
        let mut index = ArticleIndex::new(existing, DEFAULT_CAP);

        let outcome = index.insert(ArticleRecord::new("Fresh"));
        assert!(!outcome.replaced);
        assert_eq!(index.articles().len(), DEFAULT_CAP);
        assert_eq!(index.articles()[0].title, "Fresh");
        assert_eq!(outcome.archived, vec![tail]);
    }

    #[test]
    fn test_replacing_in_full_index_archives_nothing() {
        let mut index = ArticleIndex::new(titled(DEFAULT_CAP), DEFAULT_CAP);
        let mut updated = ArticleRecord::new("Article 30");
        updated.summary = "rewritten".to_string();

        let outcome = index.insert(updated);
        assert!(outcome.replaced);
        assert!(outcome.archived.is_empty());
        assert_eq!(outcome.total, DEFAULT_CAP);
        assert_eq!(index.articles().len(), DEFAULT_CAP);
        assert_eq!(index.articles()[0].summary, "rewritten");
        assert_eq!(index.articles()[DEFAULT_CAP - 1].title, format!("Article {}", DEFAULT_CAP - 1));
    }

    #[test]
    fn test_merge_replaces_stale_archived_copies() {
        let mut stale = ArticleRecord::new("Old");
        stale.summary = "stale".to_string();
        let mut archive = vec![stale, ArticleRecord::new("Older")];
        let mut newer = ArticleRecord::new("Old");
        newer.summary = "newer".to_string();
        let overflow = vec![ArticleRecord::new("New A"), newer, ArticleRecord::new("New B")];

        let added = merge_into_archive(&mut archive, overflow);
        assert_eq!(added, 3);
        let titles: Vec<&str> = archive.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["New A", "Old", "New B", "Older"]);
        assert_eq!(archive[1].summary, "newer");
    }

    #[test]
    fn test_withdraw_from_archive() {
        let mut archive = vec![ArticleRecord::new("A"), ArticleRecord::new("B")];
        assert!(withdraw_from_archive(&mut archive, "A"));
        assert!(!withdraw_from_archive(&mut archive, "A"));
        assert_eq!(archive.len(), 1);
    }
}

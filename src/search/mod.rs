//! Tantivy-based search index module.
//!
//! Provides full-text search capabilities for persisted tasks with field boosting.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::Task;

/// Field boost values matching frontend weights.
const BOOST_TITLE: f32 = 10.0;
const BOOST_SOURCE_TEXT: f32 = 7.5;
const BOOST_DESCRIPTION: f32 = 6.0;
const BOOST_ASSIGNEE: f32 = 4.0;

/// Search result with task and relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub task_id: String,
    pub score: f32,
}

/// Search index schema fields.
struct SearchFields {
    task_id: Field,
    title: Field,
    description: Field,
    source_text: Field,
    assignee: Field,
}

/// Tantivy search index for tasks.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        // Define schema
        let mut schema_builder = Schema::builder();
        let task_id = schema_builder.add_text_field("task_id", STRING | STORED);
        let title = schema_builder.add_text_field("title", TEXT | STORED);
        let description = schema_builder.add_text_field("description", TEXT);
        let source_text = schema_builder.add_text_field("source_text", TEXT);
        let assignee = schema_builder.add_text_field("assignee", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            task_id,
            title,
            description,
            source_text,
            assignee,
        };

        // Try to open existing index or create new one
        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from tasks.
    pub async fn rebuild(&self, tasks: &[Task]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        // Clear existing index
        writer.delete_all_documents()?;

        // Index all tasks
        for task in tasks {
            let doc = self.create_document(task);
            writer.add_document(doc)?;
        }

        writer.commit()?;

        // Reload reader to see new documents
        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} tasks", tasks.len());
        Ok(())
    }

    /// Index a single task.
    pub async fn index_task(&self, task: &Task) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        // Delete existing document if any
        let term = tantivy::Term::from_field_text(self.fields.task_id, &task.id);
        writer.delete_term(term);

        // Add new document
        let doc = self.create_document(task);
        writer.add_document(doc)?;
        writer.commit()?;

        // Reload reader
        self.reader.reload()?;

        Ok(())
    }

    /// Remove a task from the index.
    pub async fn remove_task(&self, task_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        let term = tantivy::Term::from_field_text(self.fields.task_id, task_id);
        writer.delete_term(term);
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Search for tasks matching the query.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchResult>, AppError> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        // Create query parser for all searchable fields
        let query_parser = QueryParser::for_index(
            &self.index,
            vec![
                self.fields.title,
                self.fields.description,
                self.fields.source_text,
                self.fields.assignee,
            ],
        );

        // Parse the user query
        let base_query = query_parser
            .parse_query(query_str)
            .map_err(|e| AppError::Search(format!("Invalid search query: {}", e)))?;

        // Create field-specific boosted queries
        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();

        // Parse query for each field with boost
        let field_queries = [
            (self.fields.title, BOOST_TITLE),
            (self.fields.source_text, BOOST_SOURCE_TEXT),
            (self.fields.description, BOOST_DESCRIPTION),
            (self.fields.assignee, BOOST_ASSIGNEE),
        ];

        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                let boosted = BoostQuery::new(field_query, boost);
                subqueries.push((Occur::Should, Box::new(boosted)));
            }
        }

        // Combine with OR semantics
        let combined_query = if subqueries.is_empty() {
            base_query
        } else {
            Box::new(BooleanQuery::new(subqueries))
        };

        // Execute search with pagination
        let top_docs = searcher
            .search(&combined_query, &TopDocs::with_limit(limit + offset))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        // Extract results with pagination
        let results: Vec<SearchResult> = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let task_id = doc.get_first(self.fields.task_id)?.as_str()?.to_string();
                Some(SearchResult { task_id, score })
            })
            .collect();

        Ok(results)
    }

    /// Create a Tantivy document from a task.
    fn create_document(&self, task: &Task) -> TantivyDocument {
        doc!(
            self.fields.task_id => task.id.clone(),
            self.fields.title => task.title.clone(),
            self.fields.description => task.description.clone().unwrap_or_default(),
            self.fields.source_text => task.source_text.clone().unwrap_or_default(),
            self.fields.assignee => task.assignee_display_name.clone()
                .or_else(|| task.assignee.clone())
                .unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, Priority, TaskStatus};
    use tempfile::TempDir;

    fn create_test_task(id: &str, title: &str, source_text: &str) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            assignee: None,
            assignee_member_id: None,
            assignee_display_name: None,
            unassigned_reason: None,
            priority: Priority::Medium,
            due_date: None,
            optional: false,
            inferred: false,
            confidence: Confidence::High,
            source_text: Some(source_text.to_string()),
            status: TaskStatus::Open,
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
            version: 1,
        }
    }

    #[tokio::test]
    async fn test_search_index_creation() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let tasks = vec![
            create_test_task("1", "Implement rate limiting", "I will implement rate limiting"),
            create_test_task("2", "Update onboarding docs", "the onboarding docs are outdated"),
        ];

        index.rebuild(&tasks).await.unwrap();

        let results = index.search("rate limiting", 10, 0).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].task_id, "1");
    }

    #[tokio::test]
    async fn test_search_empty_query() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let results = index.search("", 10, 0).unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_remove_task() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let task = create_test_task("1", "Rotate API keys", "Dana needs to rotate the API keys");
        index.rebuild(&[task]).await.unwrap();
        assert!(!index.search("rotate", 10, 0).unwrap().is_empty());

        index.remove_task("1").await.unwrap();
        assert!(index.search("rotate", 10, 0).unwrap().is_empty());
    }
}

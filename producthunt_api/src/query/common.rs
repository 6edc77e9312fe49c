//! Shared query infrastructure: the [`Query`] trait and [`QueryCommon`] cursor fields.

use serde_json::{Map, Value};

/// Trait implemented by all GraphQL query builders. Provides request-body
/// serialization and shared builder methods for cursor pagination.
pub trait Query {
    /// The GraphQL document sent as `query`.
    fn document(&self) -> &'static str;

    /// Variables for this query, excluding the common pagination fields.
    fn variables(&self) -> Map<String, Value>;

    /// Returns a shared reference to the common query fields.
    fn common(&self) -> &QueryCommon;

    /// Returns a mutable reference to the common query fields.
    fn get_common(&mut self) -> &mut QueryCommon;

    /// Builds the JSON request body: `{"query": ..., "variables": {...}}`.
    fn to_request_body(&self) -> Value {
        let mut variables = self.variables();
        self.common().add_to_variables(&mut variables);
        serde_json::json!({
            "query": self.document(),
            "variables": Value::Object(variables),
        })
    }

    /// Sets the number of results per page (GraphQL `first`).
    fn with_first(mut self, first: i64) -> Self
    where
        Self: Sized,
    {
        self.get_common().first = Some(first);
        self
    }

    /// Resumes after the given cursor (GraphQL `after`).
    fn with_after(mut self, cursor: Option<&str>) -> Self
    where
        Self: Sized,
    {
        self.get_common().after = cursor.map(str::to_string);
        self
    }
}

/// Fields shared by all connection queries: page size and cursor.
#[derive(Clone, Debug, Default)]
pub struct QueryCommon {
    /// Results per page. `None` uses the API default.
    pub first: Option<i64>,
    /// Opaque cursor of the last item already seen.
    pub after: Option<String>,
}

impl QueryCommon {
    /// Inserts the pagination variables that are set.
    pub fn add_to_variables(&self, variables: &mut Map<String, Value>) {
        if let Some(first) = self.first {
            variables.insert("first".to_string(), Value::from(first));
        }
        if let Some(after) = &self.after {
            variables.insert("after".to_string(), Value::from(after.clone()));
        }
    }
}

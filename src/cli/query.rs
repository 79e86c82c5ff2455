//! Query command handler.

use color_eyre::Result;

use crate::context::Context;
use crate::di::FromRef;
use crate::services::QueryService;

use super::{print_json, App};

impl App {
    /// Run criteria through a repository: all rows, one page, or one record.
    pub async fn run_query(
        &self,
        ctx: &Context,
        model: &str,
        criteria: Option<&str>,
        page: Option<u64>,
        page_size: Option<u64>,
        one: bool,
    ) -> Result<()> {
        let service = QueryService::from_ref(ctx);

        if one {
            let record = service.find_one(model, criteria).await?;
            return print_json(&record);
        }

        if page.is_some() || page_size.is_some() {
            let page = service.find_page(model, criteria, page, page_size).await?;
            tracing::debug!(count = page.count, rows = page.rows.len(), "Fetched page");
            return print_json(&page);
        }

        let rows = service.find(model, criteria).await?;
        tracing::debug!(rows = rows.len(), "Fetched rows");
        print_json(&rows)
    }
}

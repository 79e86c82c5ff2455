//! Compile command handler.

use color_eyre::Result;

use crate::context::Context;
use crate::di::FromRef;
use crate::services::QueryService;

use super::{print_json, App};

impl App {
    /// Print the descriptor a backend would receive for the criteria.
    pub fn run_compile(
        &self,
        ctx: &Context,
        criteria: Option<&str>,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<()> {
        let query = QueryService::from_ref(ctx).compile(criteria, page, page_size)?;
        print_json(&query)
    }
}

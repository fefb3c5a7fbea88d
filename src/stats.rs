//! Index statistics.
//!
//! Summarizes what is indexed: total units plus breakdowns by tenant, by
//! document name and by `(tenant, document)`. Used by `shoprag stats` and
//! `GET /stats`.

use anyhow::Result;

use crate::context::AppContext;
use crate::store::StoreStats;

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(ctx: &AppContext) -> Result<()> {
    let stats = ctx.store.stats().await?;
    print!("{}", render_stats(&stats));
    Ok(())
}

/// Render stats as the text table printed by `shoprag stats`.
pub fn render_stats(stats: &StoreStats) -> String {
    let mut out = String::new();
    out.push_str("shop-rag — Index Stats\n");
    out.push_str("======================\n\n");
    out.push_str(&format!("  Indexed units: {}\n", stats.total));

    if !stats.by_tenant.is_empty() {
        out.push_str("\n  By tenant:\n");
        out.push_str(&format!("  {:<32} {:>8}\n", "TENANT", "UNITS"));
        out.push_str(&format!("  {}\n", "-".repeat(41)));
        for t in &stats.by_tenant {
            out.push_str(&format!("  {:<32} {:>8}\n", t.tenant_id, t.count));
        }
    }

    if !stats.by_document.is_empty() {
        out.push_str("\n  By document:\n");
        out.push_str(&format!("  {:<32} {:>8}\n", "DOCUMENT", "UNITS"));
        out.push_str(&format!("  {}\n", "-".repeat(41)));
        for d in &stats.by_document {
            out.push_str(&format!("  {:<32} {:>8}\n", d.source_document, d.count));
        }
    }

    if !stats.by_tenant_document.is_empty() {
        out.push_str("\n  By tenant and document:\n");
        out.push_str(&format!(
            "  {:<20} {:<32} {:>8}\n",
            "TENANT", "DOCUMENT", "UNITS"
        ));
        out.push_str(&format!("  {}\n", "-".repeat(62)));
        for p in &stats.by_tenant_document {
            out.push_str(&format!(
                "  {:<20} {:<32} {:>8}\n",
                p.tenant_id, p.source_document, p.count
            ));
        }
    }

    out.push('\n');
    out
}

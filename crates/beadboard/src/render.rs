//! Plain-text board rendering.

use itertools::Itertools;

use beadboard_core::{Batch, Issue, IssueStatus, SyncStore};

/// Status-column view of the full issue list.
pub fn render_board(issues: &[Issue]) -> String {
    let mut out = String::new();
    for status in IssueStatus::ALL {
        let column: Vec<&Issue> = issues
            .iter()
            .filter(|i| i.status == status)
            .sorted_by(|a, b| a.id.cmp(&b.id))
            .collect();
        if column.is_empty() {
            continue;
        }
        out.push_str(&format!("{status} ({})\n", column.len()));
        for issue in column {
            let marker = if issue.is_epic() { "◆" } else { "·" };
            out.push_str(&format!("  {marker} {}  {}\n", issue.id, issue.title));
        }
        out.push('\n');
    }
    if out.is_empty() {
        out.push_str("no issues\n");
    }
    out
}

/// Batch view under a selected epic.
///
/// Collapsed batches render as a one-line summary.
pub fn render_batches(root_id: &str, batches: &[Batch], store: &SyncStore) -> String {
    let mut out = format!("batches under {root_id}\n\n");
    if batches.is_empty() {
        out.push_str("  (no open work)\n");
        return out;
    }
    for batch in batches {
        let done = batch.issues.iter().filter(|i| i.issue.is_closed()).count();
        if store.is_batch_collapsed(batch.index) {
            out.push_str(&format!(
                "▸ batch {}  [{done}/{} done]\n",
                batch.index + 1,
                batch.issues.len(),
            ));
            continue;
        }
        out.push_str(&format!(
            "▾ batch {}  [{done}/{} done]\n",
            batch.index + 1,
            batch.issues.len(),
        ));
        for entry in &batch.issues {
            let deps = if entry.depends_on.is_empty() {
                String::new()
            } else {
                format!("  ← {}", entry.depends_on.iter().join(", "))
            };
            out.push_str(&format!(
                "    {}  {}  [{}]{deps}\n",
                entry.id(),
                entry.issue.title,
                entry.issue.status,
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn issue(id: &str, status: IssueStatus) -> Issue {
        Issue {
            id: id.to_string(),
            title: format!("Issue {id}"),
            status,
            issue_type: None,
            parent: None,
            priority: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            closed_at: None,
        }
    }

    #[test]
    fn test_board_groups_by_status_in_column_order() {
        let issues = vec![
            issue("bb-2", IssueStatus::Closed),
            issue("bb-1", IssueStatus::Open),
            issue("bb-3", IssueStatus::Open),
        ];
        let out = render_board(&issues);
        let open_at = out.find("open (2)");
        let closed_at = out.find("closed (1)");
        assert!(open_at.is_some());
        assert!(closed_at.is_some());
        assert!(open_at < closed_at);
    }

    #[test]
    fn test_empty_board() {
        assert_eq!(render_board(&[]), "no issues\n");
    }
}

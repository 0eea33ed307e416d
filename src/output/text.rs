use crate::models::Task;
use crate::store::task_ops::TaskStats;
use crate::sync::SyncReport;

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub fn print_task(t: &Task) {
    println!("Task: {} ({})", t.title, t.id);
    if !t.description.is_empty() {
        println!("  Description: {}", t.description.replace('\n', "\n    "));
    }
    println!("  Status: {}", t.status.as_str());
    println!("  Priority: {}", t.priority.as_str());
    println!("  Category: {}", t.category.as_str());
    println!("  Source: {}", t.source.as_str());
    if !t.tags.is_empty() {
        println!("  Tags: {}", t.tags.join(", "));
    }
    if let Some(ref due) = t.due_date {
        println!("  Due: {due}");
    }
    println!("  Created: {}", t.created_at.to_rfc3339());
    println!("  Updated: {}", t.updated_at.to_rfc3339());
    if let Some(completed) = t.completed_at {
        println!("  Completed: {}", completed.to_rfc3339());
    }
}

pub fn print_task_list(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }
    for t in tasks {
        println!(
            "  [{}] {} ({}) p={} {}{}",
            t.status.as_str(),
            t.title,
            short_id(&t.id),
            t.priority.as_str(),
            t.source.as_str(),
            t.due_date
                .as_deref()
                .map(|d| format!(" due {d}"))
                .unwrap_or_default()
        );
    }
}

pub fn print_stats(s: &TaskStats) {
    println!("Total: {}", s.total);
    let line = |counts: &std::collections::BTreeMap<String, usize>| {
        counts
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ")
    };
    println!("  status:   {}", line(&s.by_status));
    println!("  priority: {}", line(&s.by_priority));
    println!("  category: {}", line(&s.by_category));
    println!(
        "Completed today: {}, this week: {}",
        s.completed_today, s.completed_this_week
    );
}

pub fn print_sync_report(r: &SyncReport) {
    for s in &r.sources {
        println!("  {:<10} {} candidates", s.name, s.candidates);
    }
    println!(
        "Sync{}: {} added, {} updated, {} unchanged",
        if r.dry_run { " (dry run)" } else { "" },
        r.added,
        r.updated,
        r.unchanged
    );
    if !r.saved && !r.dry_run {
        println!("Store unchanged.");
    }
}

use crate::algos::{DefenseRun, ExaminerRun, SupervisorAssignment};
use crate::model::{Professor, Project, ProjectStatus, Term};
use crate::stats::Statistics;

pub fn display_term(term: &Term) {
    println!(
        "Term {} ({}){}:",
        term.name,
        term.id,
        if term.is_active { "" } else { " [inactive]" }
    );
    for c in term.capacities.iter() {
        println!(
            "  - {}: {}/{} approved",
            c.major, c.current_count, c.max_projects
        );
    }
}

pub fn display_project(p: &Project) {
    println!("Project {} (student {}, {}): {}", p.id, p.student, p.major, p.status);
    if let Some(s) = p.supervisor {
        println!("  supervisor: {s}");
    }
    if let Some(e) = p.examiner {
        println!("  examiner: {e}");
    }
    match &p.topic {
        Some(topic) => println!("  topic: {topic}"),
        None => {
            for (i, topic) in p.proposed_topics.iter().enumerate() {
                println!("  proposed topic #{i}: {topic}");
            }
        }
    }
    match p.defense {
        Some(window) => println!("  defense: {window}"),
        None => {
            for c in &p.proposed_defense_times {
                println!("  candidate time: {} (from {})", c.window, c.submitted_by);
            }
        }
    }
    if let Some(grade) = p.grade {
        println!("  grade: {grade:.2}");
    }
}

pub fn display_pending(projects: &[Project]) {
    if projects.is_empty() {
        println!("No project is waiting for approval");
        return;
    }
    println!("Pending projects:");
    for p in projects {
        println!(
            "  - project {} (student {}, {}), requested {}",
            p.id,
            p.student,
            p.major,
            p.requested_at.format("%Y-%m-%d %H:%M")
        );
    }
}

pub fn display_professor(p: &Professor) {
    print!(
        "{} ({}): {} supervisees, {} examinees",
        p.name, p.id, p.current_supervisees, p.current_examinees
    );
    if let Some(max) = p.max_examinees {
        print!(" (max {max})");
    }
    println!();
}

pub fn display_supervisors(assignments: &[SupervisorAssignment]) {
    if assignments.is_empty() {
        println!("No project was waiting for a supervisor");
        return;
    }
    println!("Supervisors assigned:");
    for a in assignments {
        println!("  - project {}: professor {}", a.project, a.supervisor);
    }
}

pub fn display_examiners(run: &ExaminerRun) {
    if run.assignments.is_empty() && run.skipped.is_empty() {
        println!("No project was waiting for an examiner");
        return;
    }
    println!("Examiners assigned:");
    for a in &run.assignments {
        println!(
            "  - project {}: professor {} (supervisor {})",
            a.project, a.examiner, a.supervisor
        );
    }
    if !run.skipped.is_empty() {
        println!("Projects without an available examiner:");
        for p in &run.skipped {
            println!("  - project {p}");
        }
    }
}

pub fn display_defenses(run: &DefenseRun) {
    if run.scheduled.is_empty() && run.unscheduled.is_empty() {
        println!("No defense to schedule");
        return;
    }
    println!("Defenses scheduled:");
    for d in &run.scheduled {
        println!(
            "  - project {}: {} (professors {} and {})",
            d.project, d.window, d.supervisor, d.examiner
        );
    }
    if !run.unscheduled.is_empty() {
        println!("Projects without a conflict-free defense time:");
        for p in &run.unscheduled {
            println!("  - project {p}");
        }
    }
}

pub fn display_stats(stats: &Statistics) {
    println!(
        "Term {}: {} projects from {} students",
        stats.term, stats.total, stats.students
    );
    for status in ProjectStatus::ALL {
        let n = stats.count(status);
        if n != 0 {
            println!("  - {status}: {n}");
        }
    }
    if let Some(average) = stats.average_grade {
        println!("Average grade: {average:.2}");
    }
    println!("Capacities:");
    for c in stats.capacities.iter() {
        println!(
            "  - {}: {}/{} ({} left)",
            c.major,
            c.current_count,
            c.max_projects,
            c.remaining()
        );
    }
}

use ansi_term::Colour::{Green, Red, Yellow};

use crate::{
    stats::{
        daily::DailyStats,
        period::{LifetimeTotals, MonthlyStats},
        series::SeriesPoint,
    },
    storage::entities::Settings,
    sync::reconcile::ReconcileOutcome,
    tracker::{Chart, Dashboard},
};

/// Money is shown rounded to whole yen, like the home screen.
pub fn format_money(value: f64) -> String {
    format!("¥{}", value.round() as i64)
}

fn format_signed_money(value: f64) -> String {
    let sign = if value >= 0. { "+" } else { "-" };
    format!("{sign}{}", format_money(value.abs()))
}

pub fn print_daily(stats: &DailyStats) {
    println!("Today ({})\t{}", stats.date, stats.count);
    println!("Cost\t\t{}", format_money(stats.cost));
    let delta = format!("{:+}", stats.target_delta);
    if stats.target_met {
        println!("vs target\t{}\tTarget met", Green.paint(delta));
    } else {
        println!("vs target\t{}", Red.paint(delta));
    }
    println!("Saved today\t{}", format_signed_money(stats.savings_delta));
}

pub fn print_monthly(stats: &MonthlyStats) {
    println!(
        "Month {}\t{} smoked over {} days (since {})",
        stats.month, stats.actual, stats.active_days, stats.window_start
    );
    println!("Expected\t{}", stats.expected);
    println!("Avoided\t\t{}", stats.count_delta);
    println!("Saved\t\t{}", format_signed_money(stats.cost_delta));
}

pub fn print_lifetime(totals: &LifetimeTotals) {
    println!("Total\t\t{} over {} days", totals.total_count, totals.total_days);
    println!("Average\t\t{:.1}", totals.overall_average);
    println!("Spent\t\t{}", format_money(totals.total_cost));
}

pub fn print_dashboard(dashboard: &Dashboard) {
    print_daily(&dashboard.today);
    println!();
    print_monthly(&dashboard.month);
}

pub fn print_chart(chart: &Chart) {
    println!("{} {} - {}", chart.series.mode, chart.series.start, chart.series.end);
    for point in &chart.series.points {
        if let SeriesPoint::Day {
            date,
            count,
            target,
        } = point
        {
            let bar = "#".repeat(*count as usize);
            let line = format!("{}\t{:>3}\t{bar}", date.format("%m/%d %a"), count);
            if (*count as i64) <= *target {
                println!("{line}");
            } else {
                println!("{}", Red.paint(line));
            }
        }
    }
    println!();
    println!("Total\t{}", chart.summary.total);
    println!("Average\t{:.1}", chart.summary.average);
    println!("Achieved\t{}", chart.summary.achievement_rate);
}

pub fn print_settings(settings: &Settings) {
    println!("Price per pack\t\t{}", format_money(settings.price_per_pack));
    println!("Cigarettes per pack\t{}", settings.cigarettes_per_pack);
    println!("Cost per cigarette\t¥{:.1}", settings.cost_per_unit());
    println!("Daily target\t\t{}", settings.target_count);
    println!("Target cost per day\t{}", format_money(settings.daily_target_cost()));
    println!("Average before\t\t{}", settings.average_count_before);
    println!("Cost per day before\t{}", format_money(settings.baseline_daily_cost()));
}

pub fn print_sync(outcome: &ReconcileOutcome) {
    println!("Widget sync: {outcome}");
}

pub fn print_sync_warning(outcome: &ReconcileOutcome) {
    println!(
        "{}",
        Yellow.paint(format!("Widget sync: {outcome}, it wins on the next sync"))
    );
}

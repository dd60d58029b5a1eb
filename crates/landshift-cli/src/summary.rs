use console::Style;
use landshift_core::area::PercentChange;
use landshift_core::io::AnalysisReport;
use landshift_core::pipeline::AnalysisConfig;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    gain: Style,
    loss: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            gain: Style::new().green(),
            loss: Style::new().red(),
        }
    }
}

pub fn print_analysis_summary(config: &AnalysisConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Landshift Analysis"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(18)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Name"),
        s.value.apply_to(&config.name)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Archive"),
        s.path.apply_to(config.archive.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Labels"),
        s.path.apply_to(config.labels.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output.display())
    );
    println!();

    // Periods
    println!("  {}", s.header.apply_to("Periods"));
    for period in [&config.pre, &config.post] {
        println!(
            "    {:<16}{}",
            s.label.apply_to(&period.name),
            s.value.apply_to(period.dates)
        );
    }
    println!(
        "    {:<16}{}",
        s.label.apply_to("Max cloud"),
        s.value.apply_to(format!("{}%", config.scenes.max_cloud_fraction))
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Cloud prob."),
        s.value.apply_to(format!("< {}", config.cloud_mask.probability_threshold))
    );
    println!();

    // Classification
    println!("  {}", s.header.apply_to("Classification"));
    println!(
        "    {:<16}{}",
        s.label.apply_to("Method"),
        s.method.apply_to(&config.classifier)
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Sampling"),
        s.method.apply_to(config.sampling.mode)
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Trained on"),
        s.value.apply_to(config.training_period)
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Features"),
        s.value.apply_to(config.feature_bands().len())
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Validation"),
        s.method.apply_to(&config.validation)
    );
    if config.smoothing.pre.is_none() && config.smoothing.post.is_none() {
        println!(
            "    {:<16}{}",
            s.label.apply_to("Smoothing"),
            s.disabled.apply_to("disabled")
        );
    }
    println!();

    // Classes
    println!("  {}", s.header.apply_to("Classes"));
    for class in &config.classes {
        println!(
            "    {:<4}{}",
            s.label.apply_to(class.code),
            s.value.apply_to(&class.name)
        );
    }
    println!();
}

pub fn print_change_table(report: &AnalysisReport) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Land-Cover Change"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(17)));
    println!();
    println!(
        "  {:<18}{:>14}{:>14}{:>12}",
        s.header.apply_to("Class"),
        s.header.apply_to("Pre (ha)"),
        s.header.apply_to("Post (ha)"),
        s.header.apply_to("Change")
    );
    for entry in &report.change.entries {
        let change = entry.change.to_string();
        let styled = match entry.change {
            PercentChange::Finite(v) if v < 0.0 => s.loss.apply_to(change),
            PercentChange::Finite(_) => s.gain.apply_to(change),
            PercentChange::Undefined => s.disabled.apply_to(change),
        };
        println!(
            "  {:<18}{:>14.2}{:>14.2}{:>12}",
            s.label.apply_to(&entry.name),
            entry.pre_hectares,
            entry.post_hectares,
            styled
        );
    }
    println!();

    let acc = &report.accuracy;
    println!("  {}", s.header.apply_to("Accuracy"));
    for (label, value) in [
        ("Pre", acc.pre.overall),
        ("Post", acc.post.overall),
        ("Combined", acc.combined),
    ] {
        let text = value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0));
        println!(
            "    {:<12}{}",
            s.label.apply_to(label),
            s.value.apply_to(text)
        );
    }
    if acc.validation_is_optimistic {
        println!(
            "    {}",
            s.disabled
                .apply_to("validated on training labels; accuracy is optimistic")
        );
    }
}

use chrono::Local;
use weather_core::CoordinatorState;

pub fn print_state(state: &CoordinatorState) {
    if let Some(weather) = &state.weather {
        println!();
        println!("{:<22}{}", "City:", weather.city_name);
        println!("{:<22}{:.1}", "Temperature (°C):", weather.temperature);
        println!("{:<22}{}", "Weather Conditions:", weather.description);
        if let Some(url) = weather.icon_url() {
            println!("{:<22}{}", "Icon:", url);
        }
        println!(
            "{:<22}{}",
            "Observed:",
            weather.observed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
        println!();
    }
}

pub fn print_history(names: &[String]) {
    if names.is_empty() {
        println!("No searches yet.");
        return;
    }
    println!("Recent searches:");
    for name in names {
        println!("  {name}");
    }
}

pub fn print_error(message: &str) {
    eprintln!("Error: {message}");
}

pub mod config;
pub mod reminder;
pub mod run;

use remindroom_core::ReminderConfig;

/// Find a stored reminder by full id, unique id prefix or exact name.
pub fn resolve<'a>(
    configs: &'a [ReminderConfig],
    query: &str,
) -> Result<&'a ReminderConfig, String> {
    if let Some(exact) = configs.iter().find(|c| c.id.to_string() == query) {
        return Ok(exact);
    }

    let matches: Vec<_> = configs
        .iter()
        .filter(|c| c.id.to_string().starts_with(query) || c.name == query)
        .collect();
    match matches.as_slice() {
        [one] => Ok(one),
        [] => Err(format!("no reminder matches '{query}'")),
        _ => Err(format!(
            "'{query}' matches {} reminders; use a longer id",
            matches.len()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remindroom_core::ReminderDefaults;

    #[test]
    fn resolve_by_prefix_and_name() {
        let mut a = ReminderConfig::from_defaults(&ReminderDefaults::default());
        a.name = "Water".into();
        let b = ReminderConfig::from_defaults(&ReminderDefaults::default());
        let configs = vec![a.clone(), b.clone()];

        assert_eq!(resolve(&configs, &a.id.to_string()).unwrap().id, a.id);
        assert_eq!(resolve(&configs, "Water").unwrap().id, a.id);
        assert_eq!(resolve(&configs, &b.id.to_string()[..8]).unwrap().id, b.id);
        assert!(resolve(&configs, "Reminder").is_ok());
        assert!(resolve(&configs, "nothing").is_err());
        assert!(resolve(&configs, "").is_err());
    }
}

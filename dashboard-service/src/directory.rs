//! Company, machine, user and device-scan listings built from fetched
//! collections.

use monitor_client::domain::{Company, DeviceScan, Machine, User};
use serde::Serialize;

/// Device-scan action recorded when a device is registered by QR code.
pub const QR_SCAN_REGISTRATION: &str = "qr_scan_registration";

/// Machines registered to a company.
///
/// Machines store either the company code or the company name, so a machine
/// matches when its `company_code` or `company` equals `company_code`, or when
/// `company` equals that company's name. An empty code selects every machine.
pub fn machines_for_company<'a>(
    machines: &'a [Machine],
    companies: &[Company],
    company_code: &str,
) -> Vec<&'a Machine> {
    if company_code.is_empty() {
        return machines.iter().collect();
    }

    let company_name = companies
        .iter()
        .find(|c| c.company_code == company_code)
        .map(|c| c.company_name.as_str());

    machines
        .iter()
        .filter(|m| {
            m.company_code.as_deref() == Some(company_code)
                || m.company == company_code
                || company_name.is_some_and(|name| m.company == name)
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub company_code: Option<String>,
    pub machine_id: Option<String>,
}

/// Initial selection for the history view.
///
/// A routed machine selects itself and its company. Otherwise the first
/// company is selected together with its first machine, if any.
pub fn default_selection(
    companies: &[Company],
    machines: &[Machine],
    routed_machine_id: Option<&str>,
) -> Selection {
    if let Some(machine) = routed_machine_id.and_then(|id| machines.iter().find(|m| m.id == id)) {
        let company_code = machine
            .company_code
            .clone()
            .unwrap_or_else(|| machine.company.clone());
        return Selection {
            company_code: Some(company_code),
            machine_id: Some(machine.id.clone()),
        };
    }

    let Some(first) = companies.first() else {
        return Selection {
            company_code: None,
            machine_id: routed_machine_id.map(str::to_string),
        };
    };

    let machine_id = machines
        .iter()
        .find(|m| m.company == first.company_code)
        .map(|m| m.id.clone());

    Selection {
        company_code: Some(first.company_code.clone()),
        machine_id,
    }
}

/// Keeps the selected machine when it belongs to the newly selected company,
/// otherwise falls back to the company's first machine.
pub fn reconcile_machine(
    machines: &[Machine],
    companies: &[Company],
    company_code: &str,
    selected_machine_id: Option<&str>,
) -> Option<String> {
    if company_code.is_empty() {
        return selected_machine_id.map(str::to_string);
    }

    let in_company = machines_for_company(machines, companies, company_code);
    if let Some(id) = selected_machine_id {
        if in_company.iter().any(|m| m.id == id) {
            return Some(id.to_string());
        }
    }
    in_company.first().map(|m| m.id.clone())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FleetSummary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

pub fn fleet_summary<'a>(machines: impl IntoIterator<Item = &'a Machine>) -> FleetSummary {
    machines
        .into_iter()
        .fold(FleetSummary::default(), |mut s, m| {
            s.total += 1;
            if m.is_active {
                s.active += 1;
            } else {
                s.inactive += 1;
            }
            s
        })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompanySummary {
    pub total: usize,
    pub company_accounts: usize,
}

pub fn company_summary(companies: &[Company]) -> CompanySummary {
    CompanySummary {
        total: companies.len(),
        company_accounts: companies
            .iter()
            .filter(|c| c.user_type.as_deref() == Some("company"))
            .count(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub total: usize,
    pub users: usize,
    pub admins: usize,
    pub company_accounts: usize,
}

pub fn user_summary(users: &[User]) -> UserSummary {
    let count = |kind: &str| users.iter().filter(|u| u.user_type.as_deref() == Some(kind)).count();
    UserSummary {
        total: users.len(),
        users: count("user"),
        admins: count("admin"),
        company_accounts: count("company"),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceScanSummary {
    pub total: usize,
    pub qr_registrations: usize,
}

pub fn device_scan_summary(scans: &[DeviceScan]) -> DeviceScanSummary {
    DeviceScanSummary {
        total: scans.len(),
        qr_registrations: scans.iter().filter(|s| s.action == QR_SCAN_REGISTRATION).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(code: &str, name: &str, user_type: Option<&str>) -> Company {
        Company {
            id: code.to_lowercase(),
            company_code: code.to_string(),
            company_name: name.to_string(),
            address: None,
            email: None,
            gst_no: None,
            mobile_no: None,
            user_type: user_type.map(str::to_string),
            created_at: None,
        }
    }

    fn machine(id: &str, company: &str, company_code: Option<&str>, is_active: bool) -> Machine {
        Machine {
            id: id.to_string(),
            name: format!("Machine {id}"),
            company: company.to_string(),
            company_code: company_code.map(str::to_string),
            is_active,
            location: None,
            category: None,
            manufacturer_model: None,
            commissioning_date: None,
            address: None,
            equipment_description: None,
            created_at: None,
        }
    }

    fn fixtures() -> (Vec<Company>, Vec<Machine>) {
        let companies = vec![
            company("ACME", "Acme Industries", Some("company")),
            company("GLOBEX", "Globex Corp", None),
        ];
        let machines = vec![
            machine("m-1", "ACME", None, true),
            machine("m-2", "Acme Industries", None, false),
            machine("m-3", "Somewhere Else", Some("ACME"), true),
            machine("m-4", "GLOBEX", None, true),
        ];
        (companies, machines)
    }

    #[test]
    fn company_machines_match_code_or_name() {
        let (companies, machines) = fixtures();

        let ids: Vec<&str> = machines_for_company(&machines, &companies, "ACME")
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["m-1", "m-2", "m-3"]);

        assert_eq!(machines_for_company(&machines, &companies, "").len(), 4);
        assert!(machines_for_company(&machines, &companies, "NOPE").is_empty());
    }

    #[test]
    fn routed_machine_drives_selection() {
        let (companies, machines) = fixtures();

        let sel = default_selection(&companies, &machines, Some("m-3"));
        assert_eq!(sel.company_code.as_deref(), Some("ACME"));
        assert_eq!(sel.machine_id.as_deref(), Some("m-3"));

        let sel = default_selection(&companies, &machines, Some("m-4"));
        assert_eq!(sel.company_code.as_deref(), Some("GLOBEX"));
    }

    #[test]
    fn default_selection_uses_first_company() {
        let (companies, machines) = fixtures();

        let sel = default_selection(&companies, &machines, Some("unknown"));
        assert_eq!(sel.company_code.as_deref(), Some("ACME"));
        assert_eq!(sel.machine_id.as_deref(), Some("m-1"));

        assert_eq!(default_selection(&[], &[], None), Selection::default());
    }

    #[test]
    fn company_change_reselects_machine() {
        let (companies, machines) = fixtures();

        assert_eq!(
            reconcile_machine(&machines, &companies, "ACME", Some("m-2")).as_deref(),
            Some("m-2")
        );
        assert_eq!(
            reconcile_machine(&machines, &companies, "GLOBEX", Some("m-2")).as_deref(),
            Some("m-4")
        );
        assert_eq!(reconcile_machine(&machines, &companies, "NOPE", Some("m-2")), None);
    }

    #[test]
    fn users_are_counted_per_type() {
        let user = |id: &str, kind: Option<&str>| User {
            id: id.to_string(),
            company_code: "ACME".to_string(),
            company_id: None,
            department: None,
            email: None,
            full_name: id.to_string(),
            mobile_no: None,
            user_type: kind.map(str::to_string),
            created_at: None,
        };
        let users = vec![
            user("a", Some("user")),
            user("b", Some("user")),
            user("c", Some("admin")),
            user("d", Some("company")),
            user("e", None),
        ];

        assert_eq!(
            user_summary(&users),
            UserSummary { total: 5, users: 2, admins: 1, company_accounts: 1 }
        );
    }

    #[test]
    fn summaries_count_by_kind() {
        let (companies, machines) = fixtures();

        assert_eq!(
            fleet_summary(&machines),
            FleetSummary { total: 4, active: 3, inactive: 1 }
        );
        assert_eq!(
            company_summary(&companies),
            CompanySummary { total: 2, company_accounts: 1 }
        );

        let scans = vec![
            DeviceScan {
                id: "d-1".to_string(),
                action: QR_SCAN_REGISTRATION.to_string(),
                company: Some("ACME".to_string()),
                device_id: "dev-1".to_string(),
                scanned_at: None,
                serial_number: Some("SN-1".to_string()),
            },
            DeviceScan {
                id: "d-2".to_string(),
                action: "manual_entry".to_string(),
                company: None,
                device_id: "dev-2".to_string(),
                scanned_at: None,
                serial_number: None,
            },
        ];
        assert_eq!(
            device_scan_summary(&scans),
            DeviceScanSummary { total: 2, qr_registrations: 1 }
        );
    }
}

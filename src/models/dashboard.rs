use std::fmt;
use std::str::FromStr;

/// Role dashboards whose statistics are cached, one key each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dashboard {
    Secretary,
    Manager,
    Admin,
}

impl Dashboard {
    pub const ALL: [Dashboard; 3] = [Dashboard::Secretary, Dashboard::Manager, Dashboard::Admin];

    pub fn cache_key(&self) -> &'static str {
        match self {
            Dashboard::Secretary => "secretary_dashboard_stats",
            Dashboard::Manager => "manager_dashboard_stats",
            Dashboard::Admin => "admin_dashboard_stats",
        }
    }

    /// Path segment of the reporting endpoint.
    pub fn slug(&self) -> &'static str {
        match self {
            Dashboard::Secretary => "secretary",
            Dashboard::Manager => "manager",
            Dashboard::Admin => "admin",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Dashboard::Secretary => "Inventory movement today (transactions, stock in/out, items)",
            Dashboard::Manager => "Inventory, equipment and pending lab results",
            Dashboard::Admin => "Personnel, certificates and system totals",
        }
    }
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Dashboard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dashboard::ALL
            .into_iter()
            .find(|d| d.slug().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown dashboard '{}'", s.trim()))
    }
}

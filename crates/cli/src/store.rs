//! Hosted store commands: login, logout, visible, invoke.
//!
//! `bestie login`    save credentials
//! `bestie logout`   delete credentials
//! `bestie visible`  owned + shared sponsorships with live funding
//! `bestie invoke`   call a remote procedure

use bestie_config::Settings;
use bestie_funding::money::format_cents;
use bestie_funding::{load_visible_sponsorships, Viewer, VisibleSponsorship};
use bestie_store_client::{
    delete_auth, load_auth, save_auth, AuthCredentials, StoreClient, StoreError,
};
use chrono::Utc;

use crate::{print_json, CliError};

// ── Login ───────────────────────────────────────────────────────────

pub fn cmd_login(
    url: Option<String>,
    api_key: String,
    token: Option<String>,
    user_id: Option<String>,
    email: Option<String>,
) -> Result<(), CliError> {
    let api_base = url
        .or_else(|| Settings::load().store_url)
        .map(|u| u.trim().trim_end_matches('/').to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            CliError::usage("no store URL")
                .with_hint("pass --url or set store.url in settings.json")
        })?;
    if !(api_base.starts_with("https://") || api_base.starts_with("http://")) {
        return Err(CliError::usage(format!("store URL must be http(s): {}", api_base)));
    }
    if api_key.trim().is_empty() {
        return Err(CliError::usage("empty --api-key"));
    }

    let creds = AuthCredentials {
        token,
        user_id,
        email,
        ..AuthCredentials::new(api_base.clone(), api_key)
    };
    let path = save_auth(&creds).map_err(CliError::store)?;

    tracing::debug!(path = %path.display(), "saved credentials");
    match &creds.user_id {
        Some(id) => eprintln!("Logged in to {} as {}", api_base, id),
        None => eprintln!("Saved project key for {}", api_base),
    }
    Ok(())
}

pub fn cmd_logout() -> Result<(), CliError> {
    if delete_auth().map_err(CliError::store)? {
        eprintln!("Logged out");
    } else {
        eprintln!("Not logged in");
    }
    Ok(())
}

// ── Visible ─────────────────────────────────────────────────────────

pub fn cmd_visible(viewer: Option<String>, email: Option<String>, json: bool) -> Result<(), CliError> {
    let creds = load_auth().ok_or_else(|| CliError::store(StoreError::NotAuthenticated))?;

    // The saved email only belongs to the saved account.
    let (viewer_id, email) = match viewer {
        Some(id) => (id, email),
        None => {
            let id = creds.user_id.clone().ok_or_else(|| {
                CliError::usage("no viewer id")
                    .with_hint("pass --viewer or log in with --user-id")
            })?;
            (id, email.or_else(|| creds.email.clone()))
        }
    };

    let client = StoreClient::new(creds).map_err(CliError::store)?;
    let viewer = Viewer::new(viewer_id, email);
    let view = load_visible_sponsorships(&client, &viewer, Utc::now()).map_err(CliError::funding)?;

    for warning in &view.warnings {
        eprintln!("warning: {}", warning);
    }

    if json {
        return print_json(&view);
    }

    if view.entries.is_empty() {
        eprintln!("No sponsorships visible to {}", viewer.id);
        return Ok(());
    }
    for entry in &view.entries {
        println!("{}", describe(entry));
    }
    Ok(())
}

fn describe(entry: &VisibleSponsorship) -> String {
    let s = &entry.sponsorship;
    let provenance = if entry.owned {
        "owned".to_string()
    } else {
        format!("shared by {}", entry.shared_by.as_deref().unwrap_or("unknown"))
    };
    let key = s
        .beneficiary_key()
        .map(|k| k.to_string())
        .unwrap_or_else(|| "-".to_string());
    let amount = s.amount_cents.map(format_cents).unwrap_or_else(|| "-".to_string());
    let funding = match &entry.funding {
        Some(f) => format!(
            "pledged {} of {}",
            format_cents(f.current_monthly_pledges_cents),
            format_cents(f.monthly_goal_cents)
        ),
        None => "funding unavailable".to_string(),
    };
    format!(
        "{:<14} {:<20} {:<28} {:>8} {:<9} {:<5} {}",
        s.id,
        provenance,
        key,
        amount,
        s.frequency.to_string(),
        s.payment_mode.to_string(),
        funding
    )
}

// ── Invoke ──────────────────────────────────────────────────────────

pub fn cmd_invoke(function: String, body: String) -> Result<(), CliError> {
    if function.trim().is_empty() || function.contains('/') {
        return Err(CliError::usage(format!("invalid function name '{}'", function)));
    }
    let body: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
        CliError::usage(format!("--body is not valid JSON: {}", e))
            .with_hint(r#"e.g. --body '{"pack_id":"pk_1"}'"#)
    })?;

    let client = StoreClient::from_saved_auth().map_err(CliError::store)?;
    let result = client.invoke(&function, &body).map_err(CliError::store)?;
    print_json(&result)
}

//! The store as the merge layer's record source.
//!
//! Table and column names are the hosted schema's: `sponsorships`,
//! `sponsorship_shares`, `sponsor_besties`, `featured_besties`.

use bestie_funding::content::{FeaturedProfile, SponsorBeneficiaryRecord};
use bestie_funding::decode::{decode_shares, decode_sponsorships, decode_table, Decoded};
use bestie_funding::{
    BeneficiaryKey, ContentCatalog, FundingError, PaymentMode, Sponsorship, SponsorshipShare,
    SponsorshipSource, Viewer,
};
use serde_json::Value;

use crate::client::StoreClient;
use crate::error::StoreError;
use crate::query::{Filter, Query};

const SPONSORSHIPS: &str = "sponsorships";
const SHARES: &str = "sponsorship_shares";
const SPONSOR_RECORDS: &str = "sponsor_besties";
const FEATURED: &str = "featured_besties";

impl From<StoreError> for FundingError {
    fn from(e: StoreError) -> Self {
        FundingError::Source(e.to_string())
    }
}

/// Roster ids and profile ids, in key order.
fn split_keys(keys: &[BeneficiaryKey]) -> (Vec<String>, Vec<String>) {
    let mut roster = Vec::new();
    let mut profiles = Vec::new();
    for key in keys {
        match key {
            BeneficiaryKey::Roster(id) => roster.push(id.clone()),
            BeneficiaryKey::Profile(id) => profiles.push(id.clone()),
        }
    }
    (roster, profiles)
}

fn records<T>(decoded: Decoded<T>) -> Vec<T> {
    if !decoded.rejected.is_empty() {
        log::info!("{} row(s) could not be decoded", decoded.rejected.len());
    }
    decoded.records
}

impl StoreClient {
    fn sponsorship_rows(&self, query: &Query) -> Result<Vec<Sponsorship>, FundingError> {
        let rows: Vec<Value> = self.select(query)?;
        Ok(records(decode_sponsorships(&rows)))
    }
}

impl SponsorshipSource for StoreClient {
    fn owned_sponsorships(&self, viewer: &Viewer) -> Result<Vec<Sponsorship>, FundingError> {
        let query = Query::table(SPONSORSHIPS).order("created_at", false);
        let query = match viewer.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) => query.or(vec![
                Filter::eq("sponsor_id", viewer.id.as_str()),
                Filter::ilike_exact("sponsor_email", email),
            ]),
            None => query.eq("sponsor_id", viewer.id.as_str()),
        };
        self.sponsorship_rows(&query)
    }

    fn shares_for(&self, viewer_id: &str) -> Result<Vec<SponsorshipShare>, FundingError> {
        let rows = self.select(&Query::table(SHARES).eq("bestie_id", viewer_id))?;
        Ok(records(decode_shares(&rows)))
    }

    fn sponsorships_by_ids(&self, ids: &[String]) -> Result<Vec<Sponsorship>, FundingError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.sponsorship_rows(&Query::table(SPONSORSHIPS).is_in("id", ids.iter().cloned()))
    }

    fn beneficiary_sponsorships(
        &self,
        keys: &[BeneficiaryKey],
        mode: PaymentMode,
    ) -> Result<Vec<Sponsorship>, FundingError> {
        let (roster, profiles) = split_keys(keys);
        let mut any_of = Vec::new();
        if !roster.is_empty() {
            any_of.push(Filter::is_in("sponsor_bestie_id", roster));
        }
        if !profiles.is_empty() {
            any_of.push(Filter::is_in("bestie_id", profiles));
        }
        if any_of.is_empty() {
            return Ok(Vec::new());
        }

        // Only active rows can contribute to either total.
        let query = Query::table(SPONSORSHIPS)
            .eq("payment_mode", mode.to_string())
            .eq("status", "active")
            .or(any_of);
        self.sponsorship_rows(&query)
    }

    fn content_for(&self, keys: &[BeneficiaryKey]) -> Result<ContentCatalog, FundingError> {
        let (roster, profiles) = split_keys(keys);
        let mut catalog = ContentCatalog::default();

        let mut any_of = Vec::new();
        if !roster.is_empty() {
            any_of.push(Filter::is_in("id", roster));
        }
        if !profiles.is_empty() {
            any_of.push(Filter::is_in("bestie_id", profiles.iter().cloned()));
        }
        if !any_of.is_empty() {
            let rows = self.select(&Query::table(SPONSOR_RECORDS).or(any_of))?;
            catalog.sponsor_records =
                records(decode_table::<SponsorBeneficiaryRecord>(SPONSOR_RECORDS, &rows));
        }

        if !profiles.is_empty() {
            let rows = self.select(
                &Query::table(FEATURED)
                    .eq("is_active", "true")
                    .is_in("bestie_id", profiles),
            )?;
            catalog.featured_profiles = records(decode_table::<FeaturedProfile>(FEATURED, &rows));
        }

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthCredentials;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> StoreClient {
        StoreClient::new(AuthCredentials::new(server.base_url(), "anon_key".into())).unwrap()
    }

    fn row(id: &str, sponsor: &str, bestie: &str) -> Value {
        json!({
            "id": id,
            "sponsor_id": sponsor,
            "bestie_id": bestie,
            "amount": 25,
            "frequency": "monthly",
            "status": "active",
            "payment_mode": "live"
        })
    }

    #[test]
    fn test_owned_by_id_or_email() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/sponsorships")
                .query_param("or", r#"(sponsor_id.eq."u_1",sponsor_email.ilike."guest@example.com")"#)
                .query_param("order", "created_at.desc");
            then.status(200).json_body(json!([
                row("sp_1", "u_1", "p_1"),
                { "id": "sp_bad", "frequency": "weekly", "status": "active" }
            ]));
        });

        let viewer = Viewer::new("u_1", Some(" guest@example.com ".into()));
        let owned = client(&server).owned_sponsorships(&viewer).unwrap();

        mock.assert();
        assert_eq!(owned.len(), 1, "undecodable rows are dropped");
        assert_eq!(owned[0].amount_cents, Some(2500));
    }

    #[test]
    fn test_owned_email_wildcards_escaped() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/sponsorships")
                .query_param("or", r#"(sponsor_id.eq."u_1",sponsor_email.ilike."john\\_doe@x.com")"#);
            then.status(200).json_body(json!([]));
        });

        let viewer = Viewer::new("u_1", Some("john_doe@x.com".into()));
        client(&server).owned_sponsorships(&viewer).unwrap();
        mock.assert();
    }

    #[test]
    fn test_owned_without_email() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/sponsorships")
                .query_param("sponsor_id", "eq.u_1")
                .query_param_missing("or");
            then.status(200).json_body(json!([]));
        });

        let owned = client(&server)
            .owned_sponsorships(&Viewer::new("u_1", None))
            .unwrap();
        mock.assert();
        assert!(owned.is_empty());
    }

    #[test]
    fn test_shares_and_ids() {
        let server = MockServer::start();
        let shares = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/sponsorship_shares")
                .query_param("bestie_id", "eq.u_2");
            then.status(200).json_body(json!([
                { "sponsorship_id": "sp_1", "bestie_id": "u_2", "shared_by": "u_1" }
            ]));
        });
        let by_ids = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/sponsorships")
                .query_param("id", r#"in.("sp_1")"#);
            then.status(200).json_body(json!([row("sp_1", "u_1", "p_1")]));
        });

        let store = client(&server);
        let found = store.shares_for("u_2").unwrap();
        assert_eq!(found[0].shared_by.as_deref(), Some("u_1"));
        let records = store.sponsorships_by_ids(&["sp_1".to_string()]).unwrap();
        assert_eq!(records[0].id, "sp_1");

        shares.assert();
        by_ids.assert();
        assert!(store.sponsorships_by_ids(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_beneficiary_query_splits_keys() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/sponsorships")
                .query_param("payment_mode", "eq.live")
                .query_param("status", "eq.active")
                .query_param("or", r#"(sponsor_bestie_id.in.("sb_1"),bestie_id.in.("p_1","p_2"))"#);
            then.status(200).json_body(json!([row("sp_1", "u_1", "p_1")]));
        });

        let keys = vec![
            BeneficiaryKey::Roster("sb_1".into()),
            BeneficiaryKey::Profile("p_1".into()),
            BeneficiaryKey::Profile("p_2".into()),
        ];
        let records = client(&server)
            .beneficiary_sponsorships(&keys, PaymentMode::Live)
            .unwrap();
        mock.assert();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_content_for_profiles_and_roster() {
        let server = MockServer::start();
        let roster = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/sponsor_besties")
                .query_param("or", r#"(id.in.("sb_1"),bestie_id.in.("p_1"))"#);
            then.status(200).json_body(json!([
                { "id": "sb_1", "bestie_name": "River", "monthly_goal": 200 }
            ]));
        });
        let featured = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/featured_besties")
                .query_param("is_active", "eq.true")
                .query_param("bestie_id", r#"in.("p_1")"#);
            then.status(200).json_body(json!([
                { "id": "f_1", "bestie_id": "p_1", "monthly_goal": "100.00" },
                { "id": "f_bad" }
            ]));
        });

        let keys = vec![
            BeneficiaryKey::Roster("sb_1".into()),
            BeneficiaryKey::Profile("p_1".into()),
        ];
        let catalog = client(&server).content_for(&keys).unwrap();

        roster.assert();
        featured.assert();
        assert_eq!(catalog.sponsor_records.len(), 1);
        assert_eq!(catalog.featured_profiles.len(), 1);
        assert_eq!(catalog.resolve(&keys[0]).monthly_goal_cents(PaymentMode::Live), 20000);
        assert_eq!(catalog.resolve(&keys[1]).kind(), "featured_profile");
    }

    #[test]
    fn test_roster_only_skips_featured() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/v1/sponsor_besties");
            then.status(200).json_body(json!([]));
        });
        let featured = server.mock(|when, then| {
            when.method(GET).path("/rest/v1/featured_besties");
            then.status(200).json_body(json!([]));
        });

        client(&server)
            .content_for(&[BeneficiaryKey::Roster("sb_1".into())])
            .unwrap();
        featured.assert_calls(0);
    }

    #[test]
    fn test_store_errors_become_source_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/v1/sponsorship_shares");
            then.status(500).json_body(json!({ "message": "boom" }));
        });

        let err = client(&server).shares_for("u_1").unwrap_err();
        assert!(matches!(err, FundingError::Source(ref m) if m.contains("boom")));
    }
}

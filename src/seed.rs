//! Sample deal catalog
//!
//! Loaded by `perkhub-admin seed` and, in dev mode without MongoDB, into the
//! in-memory catalog at start-up. Seeding replaces the whole catalog.

use tracing::info;

use crate::db::DealDoc;
use crate::store::{DealCatalog, StoreError};

const OPEN_TO_ALL: &str = "Available to all registered startups";

/// The six sample partner deals
pub fn sample_deals() -> Vec<DealDoc> {
    vec![
        DealDoc::new(
            "50% Off Notion Pro",
            "Get 50% off Notion Pro for the first year. Perfect for organizing your startup operations.",
            "Notion",
            "tools",
            false,
            OPEN_TO_ALL,
        ),
        DealDoc::new(
            "Free Slack Pro for 6 Months",
            "Free Slack Pro plan for 6 months. Includes unlimited message history and integrations.",
            "Slack",
            "tools",
            false,
            OPEN_TO_ALL,
        ),
        DealDoc::new(
            "AWS Credits - $5,000",
            "Receive $5,000 in AWS credits to kickstart your cloud infrastructure.",
            "Amazon Web Services",
            "services",
            true,
            "Requires verification as an active startup with revenue under $1M",
        ),
        DealDoc::new(
            "Stripe Atlas Discount",
            "20% discount on Stripe Atlas incorporation fees.",
            "Stripe",
            "finance",
            true,
            "Requires verification as a pre-launch startup",
        ),
        DealDoc::new(
            "Google Workspace Business Starter",
            "Free Google Workspace Business Starter for 1 year.",
            "Google",
            "tools",
            false,
            OPEN_TO_ALL,
        ),
        DealDoc::new(
            "HubSpot CRM Free",
            "Free HubSpot CRM Professional plan for 6 months.",
            "HubSpot",
            "marketing",
            false,
            OPEN_TO_ALL,
        ),
    ]
}

/// Replace the catalog contents with the sample deals
pub async fn seed_deals(catalog: &dyn DealCatalog) -> Result<usize, StoreError> {
    let count = catalog.replace_all(sample_deals()).await?;
    info!("Deals seeded successfully ({} deals)", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DealFilter, InMemoryDealCatalog};

    #[test]
    fn test_two_locked_deals() {
        let locked: Vec<_> = sample_deals()
            .into_iter()
            .filter(|d| d.is_locked)
            .map(|d| d.partner_name)
            .collect();
        assert_eq!(locked, vec!["Amazon Web Services", "Stripe"]);
    }

    #[tokio::test]
    async fn test_seed_replaces_catalog() {
        let catalog = InMemoryDealCatalog::new();
        assert_eq!(seed_deals(&catalog).await.unwrap(), 6);
        assert_eq!(seed_deals(&catalog).await.unwrap(), 6);

        let all = catalog.list(&DealFilter::default()).await.unwrap();
        assert_eq!(all.len(), 6);

        let tools = catalog
            .list(&DealFilter {
                category: Some("tools".into()),
                search: None,
            })
            .await
            .unwrap();
        assert_eq!(tools.len(), 3);
    }
}

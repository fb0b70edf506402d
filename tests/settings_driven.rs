//! End blocks driven by a settings file
//!
//! Loads a `Settings` JSON from disk and hands it to the `EndBlocker` as the
//! params provider, with the structural proof verifier.

use std::path::PathBuf;

use anyhow::Result;

use relaycraft_core::{
    Application, Claim, Coin, MerkleSumRoot, ProofValidationStatus, RevShare, Service,
    SessionHeader, Supplier, SupplierServiceConfig, APPLICATION_MODULE, DEFAULT_DENOM,
    SUPPLIER_MODULE,
};
use relaycraft_prover::StubVerifier;
use relaycraft_settings::Settings;
use relaycraft_settlement::memory::InMemoryChain;
use relaycraft_settlement::stores::Keepers;
use relaycraft_settlement::{BlockContext, EndBlockSummary, EndBlocker};

const SETTINGS_JSON: &str = r#"{
    "params": {
        "shared": {
            "grace_period_end_offset_blocks": 3,
            "compute_units_to_tokens_multiplier": 2
        },
        "proof": {
            "proof_request_probability": 0.0,
            "proof_requirement_threshold": { "denom": "ucraft", "amount": 1000 },
            "proof_missing_penalty": { "denom": "ucraft", "amount": 300 }
        },
        "supplier": {
            "min_stake": { "denom": "ucraft", "amount": 500 }
        }
    },
    "logging": { "filter": "warn" }
}"#;

fn coin(amount: u64) -> Coin {
    Coin::new(DEFAULT_DENOM, amount)
}

fn write_settings(name: &str, json: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("relaycraft-it-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("settings.json");
    std::fs::write(&path, json)?;
    Ok(path)
}

fn seed(chain: &mut InMemoryChain) {
    chain.services.insert_service(Service {
        id: "svc1".to_string(),
        name: "Service One".to_string(),
        compute_units_per_relay: 1,
        owner_address: "source_owner".to_string(),
    });
    chain.applications.insert(Application {
        address: "app1".to_string(),
        stake: coin(10_000),
        service_ids: vec!["svc1".to_string()],
        unstake_session_end_height: 0,
    });
    chain.bank.fund_module(APPLICATION_MODULE, &coin(10_000));

    for (supplier, owner, stake) in [("supplier1", "owner1", 1_000), ("supplier2", "owner2", 600)] {
        chain.suppliers.insert(Supplier {
            operator_address: supplier.to_string(),
            owner_address: owner.to_string(),
            stake: coin(stake),
            services: vec![SupplierServiceConfig {
                service_id: "svc1".to_string(),
                rev_share: vec![RevShare {
                    address: owner.to_string(),
                    rev_share_percentage: 100,
                }],
            }],
            unstake_session_end_height: 0,
        });
        chain.bank.fund_module(SUPPLIER_MODULE, &coin(stake));
    }

    for (session, supplier, compute_units) in [("s1", "supplier1", 100), ("s2", "supplier2", 600)] {
        chain.claims.insert(Claim {
            supplier_operator_address: supplier.to_string(),
            session_header: Some(SessionHeader {
                application_address: "app1".to_string(),
                service_id: "svc1".to_string(),
                session_id: session.to_string(),
                session_start_block_height: 1,
                session_end_block_height: 10,
            }),
            root_hash: MerkleSumRoot::new([4u8; 32], compute_units, compute_units).encode(),
            proof_validation_status: ProofValidationStatus::Pending,
        });
    }
}

fn end_block(
    chain: &mut InMemoryChain,
    settings: &Settings,
    verifier: &StubVerifier,
    height: u64,
) -> Result<EndBlockSummary> {
    let keepers = Keepers {
        claims: &mut chain.claims,
        proofs: &mut chain.proofs,
        suppliers: &mut chain.suppliers,
        applications: &mut chain.applications,
        services: &mut chain.services,
        bank: &mut chain.bank,
        verifier,
        params: settings,
        events: &mut chain.events,
    };
    Ok(EndBlocker::new(keepers).end_block(&BlockContext::new(height))?)
}

#[test]
fn test_settings_file_drives_end_block() -> Result<()> {
    let path = write_settings("drive", SETTINGS_JSON)?;
    let settings = Settings::load_from(&path)?;
    let _ = relaycraft_logging::try_init_logging(&settings.logging.filter);
    assert_eq!(settings.params.shared.grace_period_end_offset_blocks, 3);

    let mut chain = InMemoryChain::new(settings.params.clone());
    seed(&mut chain);
    let verifier = StubVerifier::new();

    // The grace period does not delay the proof window: 10 + 1 + 1 + 4 + 0 + 4.
    let early = end_block(&mut chain, &settings, &verifier, 19)?;
    assert_eq!(early.settlement.num_settled(), 0);
    assert_eq!(early.settlement.num_expired(), 0);
    assert_eq!(chain.claims.len(), 2);

    let summary = end_block(&mut chain, &settings, &verifier, 20)?;
    let outcome = &summary.settlement;
    assert_eq!(outcome.num_settled(), 1);
    assert_eq!(outcome.num_expired(), 1);
    assert!(chain.claims.is_empty());

    // 100 CU at multiplier 2 stays under the 1_000 threshold.
    assert_eq!(outcome.settled.claimed_amount, 200);
    assert_eq!(chain.applications.get("app1").unwrap().stake, coin(9_800));
    assert_eq!(chain.bank.account_balance("owner1", DEFAULT_DENOM), 200);

    // 600 CU is 1_200 tokens: proof required, none submitted.
    let supplier2 = chain.suppliers.get("supplier2").unwrap();
    assert_eq!(supplier2.stake, coin(300));
    assert_eq!(supplier2.unstake_session_end_height, 20);
    assert_eq!(chain.bank.module_balance(SUPPLIER_MODULE, DEFAULT_DENOM), 1_300);

    assert_eq!(outcome.relays_per_service.get("svc1"), Some(&100));
    assert!(summary.difficulty_updates.contains_key("svc1"));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
    Ok(())
}

#[test]
fn test_settings_with_overflowing_window_are_rejected() -> Result<()> {
    let json = format!(
        r#"{{ "params": {{ "shared": {{ "proof_window_close_offset_blocks": {} }} }} }}"#,
        u64::MAX
    );
    let path = write_settings("overflow", &json)?;
    assert!(Settings::load_from(&path).is_err());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
    Ok(())
}

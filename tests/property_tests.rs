//! Property-Based Tests for archpilot
//!
//! These tests verify:
//! - Partition naming for SATA, NVMe and MMC devices
//! - Progress fractions reported by the pipeline
//! - Skip decisions are pure and respect the fixed steps
//! - Field validators accept everything in their documented grammar

use proptest::prelude::*;

use archpilot::config::{BlockDevice, InstallConfig};
use archpilot::install_log::LogTag;
use archpilot::installer::pipeline::{PhaseJournal, Pipeline};
use archpilot::progress::{self, PhaseUpdate};
use archpilot::types::{DesktopEnvironment, Shell, WizardMode};
use archpilot::validate;
use archpilot::wizard::{should_skip, StepKind};
use strum::IntoEnumIterator;

// =============================================================================
// Partition Naming
// =============================================================================

proptest! {
    /// SATA/virtio disks append the partition number directly
    #[test]
    fn sata_partitions_append_number(name in "(sd|vd)[a-z]") {
        let dev = BlockDevice::new(name.clone());
        prop_assert_eq!(dev.efi_partition(), format!("/dev/{}1", name));
        prop_assert_eq!(dev.root_partition(), format!("/dev/{}2", name));
    }

    /// NVMe and MMC devices separate the number with `p`
    #[test]
    fn nvme_and_mmc_partitions_use_p(name in "(nvme[0-9]n[1-9]|mmcblk[0-9])") {
        let dev = BlockDevice::new(name.clone());
        prop_assert_eq!(dev.efi_partition(), format!("/dev/{}p1", name));
        prop_assert_eq!(dev.root_partition(), format!("/dev/{}p2", name));
    }
}

// =============================================================================
// Pipeline Fractions
// =============================================================================

#[derive(Default)]
struct Quiet;

impl PhaseJournal for Quiet {
    fn journal(&mut self, _tag: LogTag, _message: &str) {}
}

proptest! {
    /// The k-th executed phase starts at k/N, where N counts non-skipped phases
    #[test]
    fn started_fractions_are_k_over_n(skips in prop::collection::vec(any::<bool>(), 1..15)) {
        let mut pipeline = Pipeline::<Quiet>::new();
        for (i, skip) in skips.iter().copied().enumerate() {
            pipeline = pipeline.phase_unless(&format!("phase {}", i), move |_| skip, |_| Ok(()));
        }

        let (tx, rx) = progress::channel();
        let outcome = pipeline.run(&mut Quiet, &tx);
        drop(tx);
        prop_assert!(outcome.is_success());

        let updates: Vec<PhaseUpdate> = rx.collect();
        let total = skips.iter().filter(|s| !**s).count();
        let started: Vec<&PhaseUpdate> = updates.iter().filter(|u| u.phase.is_some()).collect();
        prop_assert_eq!(started.len(), total);
        for (k, update) in started.iter().enumerate() {
            let expected = k as f64 / total as f64;
            prop_assert!((update.fraction.unwrap_or(-1.0) - expected).abs() < 1e-9);
        }

        let last = updates.last().unwrap();
        prop_assert!(last.done);
        prop_assert_eq!(last.fraction, Some(1.0));
    }
}

// =============================================================================
// Skip Decisions
// =============================================================================

fn mode_strategy() -> impl Strategy<Value = WizardMode> {
    prop_oneof![
        Just(WizardMode::Interactive),
        Just(WizardMode::Prompt),
        Just(WizardMode::Skip),
    ]
}

fn maybe_text() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[a-z]{1,8}"]
}

prop_compose! {
    fn config_strategy()(
        mode in mode_strategy(),
        has_device in any::<bool>(),
        hostname in maybe_text(),
        username in maybe_text(),
        flags in prop::collection::vec(any::<bool>(), 12),
        zsh in prop::option::of(any::<bool>()),
    ) -> InstallConfig {
        let mut cfg = InstallConfig::with_defaults("4G");
        cfg.mode = mode;
        cfg.device = has_device.then(|| BlockDevice::new("sda"));
        cfg.hostname = hostname;
        cfg.username = username;
        cfg.encrypt = flags[0];
        cfg.sshd = flags[1];
        cfg.docker = flags[2];
        cfg.desktop = if flags[3] { DesktopEnvironment::Kde } else { DesktopEnvironment::None };
        cfg.shell = zsh.map(|z| if z { Shell::Zsh } else { Shell::Bash });
        cfg.marks.encrypt = flags[4];
        cfg.marks.desktop = flags[5];
        cfg.marks.sshd = flags[6];
        cfg.marks.docker = flags[7];
        cfg.marks.user_password_from_env = flags[8];
        cfg.marks.root_password_from_env = flags[9];
        cfg.marks.passphrase_from_env = flags[10];
        cfg.marks.ssh_pubkey_from_config = flags[11];
        cfg
    }
}

proptest! {
    /// Asking twice gives the same answer
    #[test]
    fn skip_decision_is_stable(cfg in config_strategy()) {
        for kind in StepKind::iter() {
            prop_assert_eq!(should_skip(kind, &cfg), should_skip(kind, &cfg));
        }
    }

    /// Welcome, Confirm and Install are always shown
    #[test]
    fn fixed_steps_are_never_skipped(cfg in config_strategy()) {
        for kind in [StepKind::Welcome, StepKind::Confirm, StepKind::Install] {
            prop_assert!(!should_skip(kind, &cfg));
        }
    }

    /// Outside skip mode only the toggled and environment-supplied steps are passed over
    #[test]
    fn non_skip_modes_show_value_steps(cfg in config_strategy()) {
        prop_assume!(cfg.mode != WizardMode::Skip);
        for kind in [StepKind::Device, StepKind::Hostname, StepKind::Username, StepKind::Desktop] {
            prop_assert!(!should_skip(kind, &cfg));
        }
    }

    /// Credentials from the environment are never asked for again
    #[test]
    fn env_credentials_always_skip(cfg in config_strategy()) {
        prop_assert_eq!(should_skip(StepKind::UserPassword, &cfg), cfg.marks.user_password_from_env);
        prop_assert_eq!(should_skip(StepKind::RootPassword, &cfg), cfg.marks.root_password_from_env);
        if cfg.encrypt {
            prop_assert_eq!(should_skip(StepKind::Passphrase, &cfg), cfg.marks.passphrase_from_env);
        } else {
            prop_assert!(should_skip(StepKind::Passphrase, &cfg));
        }
    }
}

// =============================================================================
// Validators
// =============================================================================

proptest! {
    #[test]
    fn valid_hostnames_are_accepted(name in "[a-zA-Z][a-zA-Z0-9-]{0,62}") {
        prop_assert!(validate::hostname(&name).is_ok());
    }

    #[test]
    fn hostnames_starting_with_digit_are_rejected(name in "[0-9][a-z0-9-]{0,20}") {
        prop_assert!(validate::hostname(&name).is_err());
    }

    #[test]
    fn valid_usernames_are_accepted(name in "[a-z_][a-z0-9_-]{0,31}") {
        prop_assert!(validate::username(&name).is_ok());
    }

    #[test]
    fn unit_sizes_are_accepted(size in "[1-9][0-9]{0,4}[MG]") {
        prop_assert!(validate::partition_size(&size).is_ok());
        prop_assert!(validate::zram_size(&size).is_ok());
    }

    #[test]
    fn short_passphrases_are_rejected(pp in "[a-z]{1,7}") {
        prop_assert!(validate::passphrase(&pp).is_err());
        prop_assert!(validate::password(&pp).is_ok() == (pp.len() >= 4));
    }
}

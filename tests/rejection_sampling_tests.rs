//! Integration tests for the per-slot rejection-sampling loop
//!
//! These tests verify the attempt bound, the unbounded retry mode, the
//! old-age target lowering and the birthdate derived from a target age.

mod support;

use chrono::Duration;
use population_generator::demographics::{birthdate_from_target_age, Location, RangeWeight};
use population_generator::simulation::SimulationError;
use population_generator::types::GenerationConfig;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use support::*;

/// An unsatisfiable keep module stops after exactly the configured attempts
#[test]
fn test_attempt_bound_is_exact() {
    let keep = Arc::new(CountingKeep::never());
    let config = GenerationConfig { max_attempts_per_slot: Some(5), ..base_config(1) };
    let generator = quiet_builder(config).keep_module(keep.clone()).build().unwrap();

    let error = generator.generate_person(0, 42).unwrap_err();
    assert!(matches!(error, SimulationError::AttemptsExhausted { slot: 0, attempts: 5 }));
    assert_eq!(keep.count(), 5);
    assert!(error.to_string().contains("5 attempts"));
    // rejected persons are neither recorded nor exported
    assert_eq!(generator.statistics().total(), 0);
}

/// An exhausted slot is reported as failed by the run
#[test]
fn test_exhausted_slot_is_counted_as_failed() {
    let config = GenerationConfig { max_attempts_per_slot: Some(3), ..base_config(2) };
    let generator =
        quiet_builder(config).keep_module(Arc::new(CountingKeep::never())).build().unwrap();

    let summary = generator.run().unwrap();
    assert_eq!(summary.failed_slots, 2);
    assert_eq!(summary.total, 0);
}

/// Zero attempts means unbounded, so the loop goes past the default bound
#[test]
fn test_zero_attempt_bound_is_unbounded() {
    let keep = Arc::new(CountingKeep::after(1200));
    let config = GenerationConfig {
        max_attempts_per_slot: Some(0),
        min_age: 1,
        max_age: 1,
        ..base_config(1)
    };
    let generator = quiet_builder(config).keep_module(keep.clone()).build().unwrap();

    let person = generator.generate_person(0, 42).unwrap();
    assert_eq!(keep.count(), 1200);
    assert_eq!(person.history[0].state, "Keep");
}

/// Persons failing the alive filter are retried without being exported
#[test]
fn test_alive_filter_rejects_dead_persons() {
    let exporter = Arc::new(CollectingExporter::default());
    let config = GenerationConfig {
        only_alive_patients: true,
        max_attempts_per_slot: Some(3),
        ..base_config(1)
    };
    let generator = builder_with(config, Arc::new(AlwaysDie))
        .exporter(exporter.clone())
        .build()
        .unwrap();

    let error = generator.generate_person(0, 1).unwrap_err();
    assert!(matches!(error, SimulationError::AttemptsExhausted { attempts: 3, .. }));
    assert!(exporter.summaries().is_empty());
}

/// Persons failing the dead filter are retried as well
#[test]
fn test_dead_filter_rejects_living_persons() {
    let config = GenerationConfig {
        only_dead_patients: true,
        max_attempts_per_slot: Some(2),
        ..base_config(1)
    };
    let generator = quiet_builder(config).build().unwrap();
    assert!(matches!(
        generator.generate_person(0, 1),
        Err(SimulationError::AttemptsExhausted { attempts: 2, .. })
    ));

    let config = GenerationConfig { only_dead_patients: true, ..base_config(1) };
    let generator = builder_with(config, Arc::new(AlwaysDie)).build().unwrap();
    let person = generator.generate_person(0, 1).unwrap();
    assert!(!person.alive(person.last_updated + Duration::days(7)));
}

/// After ten deaths at a target age over 90, the target is lowered into [85, 90)
#[test]
fn test_old_age_target_is_lowered_after_repeated_deaths() {
    let mut location = Location::builtin("Massachusetts", None);
    for city in &mut location.cities {
        city.ages = vec![RangeWeight::new(95, 95, 1.0)];
    }
    let exporter = Arc::new(CollectingExporter::default());
    let config = GenerationConfig { age_specified: false, ..base_config(1) };
    let generator = builder_with(config, Arc::new(DieWhenTargetOver(90)))
        .location(location)
        .exporter(exporter.clone())
        .build()
        .unwrap();

    let summary = generator.run().unwrap();
    assert_eq!(summary.dead, 11);
    assert_eq!(summary.alive, 1);
    assert_eq!(generator.retained_population().len(), 12);

    let exported = exporter.summaries();
    assert_eq!(exported.len(), 12);
    assert!(exported[..11].iter().all(|s| !s.alive));
    assert!(exported[11].alive);

    let population = generator.retained_population();
    let survivor = population.iter().find(|p| p.death().is_none()).unwrap();
    let target = survivor.target_age().unwrap();
    assert!((85..90).contains(&target));
    assert!(population.iter().filter(|p| p.death().is_some()).all(|p| p.target_age() == Some(95)));
}

/// A specified minimum age above 85 disables the lowering
#[test]
fn test_old_age_target_kept_when_minimum_age_is_high() {
    let config = GenerationConfig { min_age: 95, max_age: 95, ..base_config(1) };
    let generator = builder_with(config, Arc::new(KillFirst::new(12))).build().unwrap();

    let person = generator.generate_person(0, 3).unwrap();
    assert_eq!(person.target_age(), Some(95));
    assert_eq!(generator.statistics().dead(), 12);
}

/// Birthdates fall in the 365-day window for the target age
#[test]
fn test_birthdate_matches_target_age() {
    let reference = reference_time();
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for age in [0u32, 1, 17, 30, 64, 90, 140] {
        for _ in 0..50 {
            let birth = birthdate_from_target_age(age, reference, &mut rng);
            let days = (reference - birth).num_days();
            let age = i64::from(age);
            assert!(days >= age * 365, "{} days is too young for {}", days, age);
            assert!(days <= (age + 1) * 365 + 1, "{} days is too old for {}", days, age);
        }
    }
}

/// Generated persons carry a birthdate consistent with their target age
#[test]
fn test_generated_birthdates_match_target_ages() {
    let generator = quiet_builder(base_config(5)).build().unwrap();
    generator.run().unwrap();

    for person in generator.retained_population() {
        let age = person.target_age().unwrap();
        assert!((20..=40).contains(&age));
        let days = (reference_time() - person.birthdate().unwrap()).num_days();
        assert!(days >= age * 365 && days <= (age + 1) * 365 + 1);
    }
}

/// Slot demographics stay fixed while the person seed rotates
#[test]
fn test_retries_keep_slot_demographics() {
    let exporter = Arc::new(CollectingExporter::default());
    let generator = builder_with(base_config(1), Arc::new(KillFirst::new(1)))
        .exporter(exporter.clone())
        .build()
        .unwrap();
    generator.generate_person(0, 99).unwrap();

    let exported = exporter.summaries();
    assert_eq!(exported.len(), 2);
    assert_eq!(exported[0].birthdate, exported[1].birthdate);
    assert_eq!(exported[0].city, exported[1].city);
    assert_eq!(exported[0].gender, exported[1].gender);
    assert_ne!(exported[0].id, exported[1].id);
}

//! Integration tests for the `layered_vec` package.
//!
//! These tests drive `Vector<T>` through its public API only, covering mixed sequences of
//! operations, ordering guarantees and the bookkeeping of element lifetimes.

use std::thread;

use layered_vec::Vector;
use testing::{Census, Specimen, expect_panic, values};

#[test]
fn mixed_operations_scenario() {
    let mut vector = Vector::new();
    let mut capacities = Vec::new();

    for value in 1..=5 {
        vector.push_back(value);
        capacities.push(vector.capacity());
    }

    assert_eq!(vector.as_slice(), &[1, 2, 3, 4, 5]);
    assert_eq!(capacities, vec![1, 2, 4, 4, 8]);

    let next = vector.erase(2);
    assert_eq!(next, 2);
    assert_eq!(vector.as_slice(), &[1, 2, 4, 5]);

    vector.insert(1, 99);
    assert_eq!(vector.as_slice(), &[1, 99, 2, 4, 5]);

    assert_eq!(vector.pop_back(), Some(5));
    assert_eq!(vector.as_slice(), &[1, 99, 2, 4]);

    vector.resize(2);
    assert_eq!(vector.as_slice(), &[1, 99]);

    vector.resize(4);
    assert_eq!(vector.as_slice(), &[1, 99, 0, 0]);

    // Nothing above needed more than the storage the appends produced.
    assert_eq!(vector.capacity(), 8);
}

#[test]
fn insert_and_erase_preserve_order() {
    let mut vector: Vector<u32> = (0..10).collect();
    let mut model: Vec<u32> = (0..10).collect();

    for (step, index) in [3_usize, 0, 7, 11, 5, 1].into_iter().enumerate() {
        let value = 100 + u32::try_from(step).unwrap();
        vector.insert(index, value);
        model.insert(index, value);
        assert_eq!(vector.as_slice(), model.as_slice());
    }

    for index in [0_usize, 4, 9, 2] {
        let next = vector.erase(index);
        model.remove(index);

        assert_eq!(next, index);
        assert_eq!(vector.as_slice(), model.as_slice());
    }

    assert!(vector.len() <= vector.capacity());
}

#[test]
fn erase_everything_from_the_front() {
    let mut vector: Vector<String> = ["a", "b", "c"].into_iter().map(String::from).collect();

    let mut erased_at = Vec::new();
    while !vector.is_empty() {
        let next = vector.erase(0);
        erased_at.push(next);
    }

    assert_eq!(erased_at, vec![0, 0, 0]);
    assert_eq!(vector.capacity(), 3);
}

#[test]
fn clone_is_independent_of_original() {
    let mut original = Vector::from([vec![1], vec![2, 2]]);

    let copy = original.clone();
    original[0].push(10);
    original.push_back(vec![3]);

    assert_eq!(copy.as_slice(), &[vec![1], vec![2, 2]]);
    assert_eq!(original.len(), 3);
}

#[test]
fn take_from_and_move_assign_transfer_without_cloning() {
    Census::reset();

    let mut first: Vector<Specimen> = (0..4).map(Specimen::new).collect();
    let mut second: Vector<Specimen> = (10..12).map(Specimen::new).collect();

    let mut taken = Vector::take_from(&mut first);
    assert!(first.is_empty());
    assert_eq!(first.capacity(), 0);

    taken.move_assign(&mut second);
    assert_eq!(values(&taken), vec![10, 11]);
    assert_eq!(values(&second), vec![0, 1, 2, 3]);

    assert_eq!(Census::snapshot().cloned(), 0);
    assert_eq!(Census::snapshot().dropped(), 0);
}

#[test]
fn every_panic_point_during_clone_is_rolled_back() {
    Census::reset();

    let original: Vector<Specimen> = (0..6).map(Specimen::new).collect();

    for successful in 0..6 {
        Census::panic_on_clone_after(successful);

        let message = expect_panic(|| original.clone());
        assert!(message.contains("injected panic"), "unexpected panic: {message}");

        // Every clone that succeeded before the panic has been dropped again.
        assert_eq!(Census::snapshot().live(), 6);
    }

    assert_eq!(values(&original), vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn every_panic_point_during_sized_construction_is_rolled_back() {
    Census::reset();

    for successful in 0..5 {
        Census::panic_on_default_after(successful);

        expect_panic(|| Vector::<Specimen>::with_len(5));

        assert_eq!(Census::snapshot().live(), 0);
    }

    let vector = Vector::<Specimen>::with_len(5);
    assert_eq!(values(&vector), vec![0; 5]);
}

#[test]
fn panicking_constructor_at_every_insert_position_changes_nothing() {
    Census::reset();

    for spare in [false, true] {
        for index in 0..=4 {
            let mut vector: Vector<Specimen> = (0..4).map(Specimen::new).collect();
            if spare {
                vector.reserve(8);
            }
            let capacity = vector.capacity();

            expect_panic(|| {
                vector.emplace(index, || panic!("constructor failed"));
            });

            assert_eq!(values(&vector), vec![0, 1, 2, 3]);
            assert_eq!(vector.capacity(), capacity);
        }
    }

    assert_eq!(Census::snapshot().live(), 0);
}

#[test]
fn clone_from_within_capacity_stays_valid_after_panic() {
    Census::reset();

    let source: Vector<Specimen> = (100..104).map(Specimen::new).collect();

    for successful in 0..4 {
        let mut target = Vector::with_capacity(4);
        target.extend((0..2).map(Specimen::new));

        Census::panic_on_clone_after(successful);
        expect_panic(|| target.clone_from(&source));

        // Whatever mix of old and new values remains, it is a valid vector with no lost or
        // duplicated elements.
        assert!(target.len() <= target.capacity());
        assert!(target.len() >= 2);
    }

    drop(source);
    assert_eq!(Census::snapshot().live(), 0);
}

#[test]
fn owning_iteration_after_growth() {
    let mut vector = Vector::new();
    vector.extend((0..100).map(|value| value.to_string()));

    let reversed: Vec<String> = vector.into_iter().rev().collect();

    assert_eq!(reversed.len(), 100);
    assert_eq!(reversed.first().map(String::as_str), Some("99"));
    assert_eq!(reversed.last().map(String::as_str), Some("0"));
}

#[test]
fn vector_can_move_between_threads() {
    let vector: Vector<u64> = (0..1000).collect();

    let sum = thread::spawn(move || vector.iter().sum::<u64>())
        .join()
        .unwrap();

    assert_eq!(sum, 499_500);
}

#[test]
fn slice_methods_are_available() {
    let mut vector = Vector::from([5, 3, 9, 1]);

    vector.sort_unstable();

    assert_eq!(vector.first(), Some(&1));
    assert_eq!(vector.last(), Some(&9));
    assert_eq!(vector.get(10), None);
    assert!(vector.contains(&3));
}

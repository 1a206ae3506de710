use crate::repos::shared::repo::DeleteResult;
use obligations_domain::{Entity, ID};
use std::sync::Mutex;

/// Useful functions for creating inmemory repositories

pub fn insert<T: Clone>(val: &T, collection: &Mutex<Vec<T>>) {
    let mut collection = collection.lock().unwrap();
    collection.push(val.clone());
}

pub fn insert_many<T: Clone>(vals: &[T], collection: &Mutex<Vec<T>>) {
    let mut collection = collection.lock().unwrap();
    collection.extend(vals.iter().cloned());
}

pub fn find<T: Clone + Entity>(val_id: &ID, collection: &Mutex<Vec<T>>) -> Option<T> {
    let collection = collection.lock().unwrap();
    collection.iter().find(|item| item.id() == val_id).cloned()
}

pub fn find_by<T: Clone, F: FnMut(&T) -> bool>(collection: &Mutex<Vec<T>>, mut compare: F) -> Vec<T> {
    let collection = collection.lock().unwrap();
    let mut items = Vec::new();
    for item in collection.iter() {
        if compare(item) {
            items.push(item.clone());
        }
    }
    items
}

pub fn find_and_delete_by<T: Clone, F: Fn(&T) -> bool>(
    collection: &Mutex<Vec<T>>,
    compare: F,
) -> Vec<T> {
    let mut collection = collection.lock().unwrap();
    let mut deleted_items = Vec::new();
    let mut i = 0;
    while i < collection.len() {
        if compare(&collection[i]) {
            deleted_items.push(collection.remove(i));
        } else {
            i += 1;
        }
    }

    deleted_items
}

pub fn delete_by<T: Clone, F: Fn(&T) -> bool>(
    collection: &Mutex<Vec<T>>,
    compare: F,
) -> DeleteResult {
    DeleteResult {
        deleted_count: find_and_delete_by(collection, compare).len() as u64,
    }
}

/// Applies `update` to every item matching `compare` while holding the lock,
/// which makes the check and the write a single atomic step. Returns the
/// number of matched items.
pub fn update_where<T, F: Fn(&T) -> bool, U: Fn(&mut T)>(
    collection: &Mutex<Vec<T>>,
    compare: F,
    update: U,
) -> u64 {
    let mut collection = collection.lock().unwrap();
    let mut matched_count = 0;
    for item in collection.iter_mut() {
        if compare(item) {
            update(item);
            matched_count += 1;
        }
    }
    matched_count
}

/// Like `update_where` but stops at the first matching item and returns
/// what `update` returned for it
pub fn update_first_where<T, R, F: Fn(&T) -> bool, U: FnOnce(&mut T) -> R>(
    collection: &Mutex<Vec<T>>,
    compare: F,
    update: U,
) -> Option<R> {
    let mut collection = collection.lock().unwrap();
    collection.iter_mut().find(|item| compare(item)).map(update)
}

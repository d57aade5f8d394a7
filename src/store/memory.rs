//! In-process tables used when `application.storage` is `memory`.
//!
//! Each repository keeps its own queries against these tables next to its
//! Postgres queries. Every operation runs under one lock, so read-modify-write
//! sequences such as counter increments are atomic here as well.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use crate::models::{
    category::CategoryModel, page::PageModel, profile::UserProfileModel, user::UserModel,
};

#[derive(Clone, Debug, Default)]
pub struct MemoryDb {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub categories: BTreeMap<i32, CategoryModel>,
    pub pages: BTreeMap<i32, PageModel>,
    pub users: Vec<UserModel>,
    pub profiles: BTreeMap<Uuid, UserProfileModel>,
    pub liked: BTreeSet<(Uuid, i32)>,
    last_category_id: i32,
    last_page_id: i32,
}

impl Tables {
    pub fn next_category_id(&mut self) -> i32 {
        self.last_category_id += 1;
        self.last_category_id
    }

    pub fn next_page_id(&mut self) -> i32 {
        self.last_page_id += 1;
        self.last_page_id
    }
}

impl MemoryDb {
    pub(crate) fn with<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut tables)
    }
}

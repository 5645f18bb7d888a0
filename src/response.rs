//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
}

/// `count` plus listing-specific fields flattened beside it.
#[derive(Serialize)]
pub struct MetaWith<M> {
    pub count: u64,
    #[serde(flatten)]
    pub extra: M,
}

#[derive(Serialize)]
pub struct SuccessMany<T, M> {
    pub data: Vec<T>,
    pub meta: MetaWith<M>,
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data }))
}

pub fn success_many<T: Serialize, M: Serialize>(
    data: Vec<T>,
    extra: M,
) -> (StatusCode, Json<SuccessMany<T, M>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: MetaWith { count, extra },
        }),
    )
}

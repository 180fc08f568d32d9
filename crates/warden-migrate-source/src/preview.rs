// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Non-committing preview of a source population.

use tracing::instrument;
use warden_migrate_core::{Preview, PreviewRow};

use crate::connector::SourceConnector;
use crate::error::SourceError;

/// Upper bound on preview rows regardless of what the operator asks for.
pub const MAX_PREVIEW_SAMPLE: usize = 5;
const MAX_PREVIEW_PAGES: usize = 3;

pub struct PreviewSampler<'a> {
	connector: &'a dyn SourceConnector,
}

impl<'a> PreviewSampler<'a> {
	pub fn new(connector: &'a dyn SourceConnector) -> Self {
		Self { connector }
	}

	/// First `n` users (at most [`MAX_PREVIEW_SAMPLE`]) reduced to preview
	/// fields. Reads no more than a few pages and writes nothing.
	#[instrument(skip(self))]
	pub async fn sample(&self, n: usize) -> Result<Vec<PreviewRow>, SourceError> {
		let wanted = n.min(MAX_PREVIEW_SAMPLE);
		let mut rows = Vec::with_capacity(wanted);
		let mut cursor = None;

		for _ in 0..MAX_PREVIEW_PAGES {
			if rows.len() >= wanted {
				break;
			}
			let page = self.connector.page(cursor.as_ref()).await?;
			rows.extend(
				page.records
					.iter()
					.take(wanted - rows.len())
					.map(|record| record.preview()),
			);
			match page.next {
				Some(next) => cursor = Some(next),
				None => break,
			}
		}

		Ok(rows)
	}

	/// Count plus sample, as shown on the confirmation screen.
	pub async fn preview(&self, n: usize) -> Result<Preview, SourceError> {
		let sample = self.sample(n).await?;
		let total_count = self.connector.count().await;
		Ok(Preview {
			total_count,
			sample,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::connector::SourcePage;
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use warden_migrate_core::{PageCursor, SourceUserRecord};

	struct PagedSource {
		pages: Vec<Vec<SourceUserRecord>>,
		fetches: AtomicUsize,
	}

	impl PagedSource {
		fn new(page_sizes: &[usize]) -> Self {
			let mut n = 0;
			let pages = page_sizes
				.iter()
				.map(|size| {
					(0..*size)
						.map(|_| {
							n += 1;
							SourceUserRecord {
								source_id: n.to_string(),
								email: Some(format!("user{n}@x.io")),
								display_name: None,
								has_password: n % 2 == 0,
								oauth_links: vec![],
								metadata: None,
							}
						})
						.collect()
				})
				.collect();
			Self {
				pages,
				fetches: AtomicUsize::new(0),
			}
		}
	}

	#[async_trait]
	impl SourceConnector for PagedSource {
		async fn validate(&self) -> Result<(), SourceError> {
			Ok(())
		}

		async fn count(&self) -> Option<u64> {
			Some(self.pages.iter().map(Vec::len).sum::<usize>() as u64)
		}

		async fn page(&self, cursor: Option<&PageCursor>) -> Result<SourcePage, SourceError> {
			self.fetches.fetch_add(1, Ordering::SeqCst);
			let index: usize = cursor.map(|c| c.as_str().parse().unwrap()).unwrap_or(0);
			let next = (index + 1 < self.pages.len()).then(|| PageCursor::new((index + 1).to_string()));
			Ok(SourcePage {
				records: self.pages[index].clone(),
				next,
			})
		}

		async fn fetch_user(&self, _: &str) -> Result<Option<SourceUserRecord>, SourceError> {
			Ok(None)
		}
	}

	#[tokio::test]
	async fn sample_is_clamped() {
		let source = PagedSource::new(&[10]);
		let rows = PreviewSampler::new(&source).sample(50).await.unwrap();
		assert_eq!(rows.len(), MAX_PREVIEW_SAMPLE);
		assert_eq!(rows[0].email, "user1@x.io");
	}

	#[tokio::test]
	async fn sample_spans_small_pages() {
		let source = PagedSource::new(&[2, 2, 2]);
		let rows = PreviewSampler::new(&source).sample(4).await.unwrap();
		assert_eq!(rows.len(), 4);
		assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn sample_reads_at_most_three_pages() {
		let source = PagedSource::new(&[0, 0, 0, 5]);
		let rows = PreviewSampler::new(&source).sample(5).await.unwrap();
		assert!(rows.is_empty());
		assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn zero_sample_fetches_nothing() {
		let source = PagedSource::new(&[3]);
		let rows = PreviewSampler::new(&source).sample(0).await.unwrap();
		assert!(rows.is_empty());
		assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn preview_includes_count() {
		let source = PagedSource::new(&[3, 4]);
		let preview = PreviewSampler::new(&source).preview(2).await.unwrap();
		assert_eq!(preview.total_count, Some(7));
		assert_eq!(preview.sample.len(), 2);
	}
}

//! Point-in-time snapshot of one of the engine's column families.
//!
//! `slatedb` stores everything through an `object_store::ObjectStore`, which
//! has no hard-link primitive and no atomic directory rename — unlike the
//! local-filesystem checkpoint routines this is modeled after, every object
//! is copied rather than linked, and the checkpoint directory becomes visible
//! object-by-object rather than through one atomic rename. Each individual
//! `copy` is still atomic, so a reader never observes a half-written object;
//! a crash mid-checkpoint can still leave a partial directory, which `create`
//! cleans up on its way out.
//!
//! What this does *not* give: a true `GetLatestSequenceNumber` freeze. That
//! operation pins a specific sequence number against an open engine handle
//! and disables its background file deletion for the duration of the copy;
//! `object_store::ObjectStore` exposes neither operation; it is a namespace
//! of objects, not a handle to a running engine. `copy_all` lists and copies
//! by path alone, so:
//!
//! - a write landing between `list` and `copy` can appear half-reflected in
//!   the destination (some of its new objects copied, some not), and
//! - a concurrent compaction can retire a source object (supersede and
//!   eventually delete it) while the listing is still in flight, racing the
//!   copy against garbage collection.
//!
//! A faithful fix needs a handle to the live `Db` so the checkpoint can ask
//! the engine itself to pin a sequence number and hold off deletions across
//! the copy, the way the routine this is modeled after does against its
//! engine; `checkpoint::create` takes only an `ObjectStore`, so today it is
//! an at-rest directory copy, not a point-in-time one. Callers that need the
//! snapshot to be exact should quiesce writes to the column family and wait
//! out one compaction cycle before calling `create`, since nothing here
//! enforces that for them. The WAL-tail requirement stated in the engine's
//! checkpoint contract (copy every WAL segment covering `[S, tail]`, with
//! the final segment frozen at its current size) likewise has no analogue
//! here: `slatedb` has no separate on-disk WAL file this copies — every
//! write lands in an SST via its own write path — so there is no tail
//! segment to freeze in the first place.

use std::sync::Arc;

use slatedb::object_store::ObjectStore;
use slatedb::object_store::path::Path as ObjectPath;

use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointStatus {
	pub dir: String,
	pub object_count: usize,
}

/// Copy every object under `src` to the corresponding path under `dest`.
/// On any failure, objects already written under `dest` are removed before
/// the error is returned.
pub async fn create(
	object_store: Arc<dyn ObjectStore>,
	src: &ObjectPath,
	dest: &ObjectPath,
) -> Result<CheckpointStatus, StorageError> {
	let mut written = Vec::new();

	let result = copy_all(&object_store, src, dest, &mut written).await;

	match result {
		Ok(count) => Ok(CheckpointStatus {
			dir: dest.to_string(),
			object_count: count,
		}),
		Err(e) => {
			for path in written.iter().rev() {
				let _ = object_store.delete(path).await;
			}
			Err(e)
		}
	}
}

async fn copy_all(
	object_store: &Arc<dyn ObjectStore>,
	src: &ObjectPath,
	dest: &ObjectPath,
	written: &mut Vec<ObjectPath>,
) -> Result<usize, StorageError> {
	use futures::StreamExt;

	let mut listing = object_store.list(Some(src));
	let mut count = 0;

	while let Some(meta) = listing.next().await {
		let meta = meta.map_err(|e| StorageError::Corruption(e.to_string()))?;
		let relative = meta
			.location
			.as_ref()
			.strip_prefix(src.as_ref())
			.unwrap_or(meta.location.as_ref())
			.trim_start_matches('/');
		let dest_path = dest.child(relative);

		object_store
			.copy(&meta.location, &dest_path)
			.await
			.map_err(|e| StorageError::Corruption(e.to_string()))?;
		written.push(dest_path);
		count += 1;
	}

	Ok(count)
}

/// Remove a checkpoint directory entirely.
pub async fn remove(object_store: Arc<dyn ObjectStore>, dir: &ObjectPath) -> Result<(), StorageError> {
	use futures::StreamExt;

	let mut listing = object_store.list(Some(dir));
	while let Some(meta) = listing.next().await {
		let meta = meta.map_err(|e| StorageError::Corruption(e.to_string()))?;
		object_store
			.delete(&meta.location)
			.await
			.map_err(|e| StorageError::Corruption(e.to_string()))?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use slatedb::object_store::memory::InMemory;

	use super::*;

	#[tokio::test]
	async fn test_checkpoint_copies_every_object() {
		let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
		let src = ObjectPath::from("/db0/meta");
		store.put(&src.child("a"), vec![1, 2, 3].into()).await.unwrap();
		store.put(&src.child("b"), vec![4, 5].into()).await.unwrap();

		let dest = ObjectPath::from("/dump/snap1/meta");
		let status = create(store.clone(), &src, &dest).await.unwrap();
		assert_eq!(status.object_count, 2);

		let a = store.get(&dest.child("a")).await.unwrap().bytes().await.unwrap();
		assert_eq!(&a[..], &[1, 2, 3]);
	}

	#[tokio::test]
	async fn test_remove_deletes_everything_under_dir() {
		let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
		let dir = ObjectPath::from("/dump/snap1");
		store.put(&dir.child("a"), vec![1].into()).await.unwrap();

		remove(store.clone(), &dir).await.unwrap();

		use futures::StreamExt;
		let remaining: Vec<_> = store.list(Some(&dir)).collect().await;
		assert!(remaining.is_empty());
	}
}

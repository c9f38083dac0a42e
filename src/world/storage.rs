//! Cluster persistence. Saved clusters carry a private palette of block
//! values plus per-cell palette indices, so a file written under one
//! catalog's numbering loads correctly under any other: values re-register
//! through the live catalog on load.

use crate::mesh::geometry::ClusterGeometry;
use crate::world::block::Block;
use crate::world::catalog::BlockCatalog;
use crate::world::cluster::Cluster;
use crate::world::cluster_pos::ClusterPos;
use crate::world::map::WorldMap;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("cluster io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cluster encoding error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("cluster file does not match world: {0}")]
    Mismatch(String),
}

/// On-disk form of one cluster. `indices` index into `palette`, not into any
/// catalog.
#[derive(Serialize, Deserialize)]
struct SerializedCluster {
    origin: ClusterPos,
    hv_size: u32,
    d_size: u32,
    palette: Vec<Block>,
    indices: Vec<u16>,
}

/// Writes a cluster's block data. Geometry is never persisted; it is cheaper
/// to rebuild than to store.
pub fn save_cluster<W: Write>(cluster: &Cluster, writer: W) -> Result<(), StorageError> {
    let snapshot = cluster.snapshot_indices();
    let catalog = cluster.catalog();

    let mut palette = Vec::new();
    let mut remap: HashMap<u16, u16> = HashMap::new();
    let indices = snapshot
        .iter()
        .map(|&index| {
            *remap.entry(index).or_insert_with(|| {
                palette.push(catalog.get(index));
                (palette.len() - 1) as u16
            })
        })
        .collect();

    let record = SerializedCluster {
        origin: cluster.origin(),
        hv_size: cluster.hv_size(),
        d_size: cluster.d_size(),
        palette,
        indices,
    };
    bincode::serialize_into(writer, &record)?;
    Ok(())
}

/// Reads a cluster saved by [`save_cluster`], re-registering its palette in
/// `map`'s catalog. The loaded cluster comes back `Generated`.
pub fn load_cluster<R: Read>(map: &WorldMap, reader: R) -> Result<Arc<Cluster>, StorageError> {
    let record: SerializedCluster = bincode::deserialize_from(reader)?;
    if record.hv_size != map.hv_size() || record.d_size != map.d_size() {
        return Err(StorageError::Mismatch(format!(
            "cluster {} is {}x{} but the world uses {}x{}",
            record.origin,
            record.hv_size,
            record.d_size,
            map.hv_size(),
            map.d_size()
        )));
    }
    if record.indices.len() != (record.hv_size * record.hv_size * record.d_size) as usize {
        return Err(StorageError::Mismatch(format!(
            "cluster {} holds {} cells, expected {}",
            record.origin,
            record.indices.len(),
            record.hv_size * record.hv_size * record.d_size
        )));
    }

    let live: Vec<u16> = record
        .palette
        .iter()
        .map(|block| register(map.catalog(), *block))
        .collect::<Result<_, _>>()?;

    let cluster = map.ensure_cluster(record.origin);
    let hv = record.hv_size;
    for d in 0..record.d_size {
        for v in 0..hv {
            for h in 0..hv {
                let palette_index =
                    record.indices[(d * hv * hv + v * hv + h) as usize] as usize;
                let value = *live.get(palette_index).ok_or_else(|| {
                    StorageError::Mismatch(format!(
                        "cluster {} references palette slot {} of {}",
                        record.origin,
                        palette_index,
                        live.len()
                    ))
                })?;
                cluster.store_index_relative(h, v, d, value);
            }
        }
    }
    cluster.finalize_generation();
    cluster.dirty_geo();
    Ok(cluster)
}

fn register(catalog: &BlockCatalog, block: Block) -> Result<u16, StorageError> {
    if block.shape.is_invalid() {
        return Err(StorageError::Mismatch(
            "palette contains the boundary sentinel".into(),
        ));
    }
    Ok(catalog.add(block))
}

/// Writes finalized geometry for a persistence collaborator that caches
/// built meshes across runs.
pub fn save_geometry<W: Write>(
    geometry: &ClusterGeometry,
    writer: W,
) -> Result<(), StorageError> {
    bincode::serialize_into(writer, geometry)?;
    Ok(())
}

pub fn load_geometry<R: Read>(reader: R) -> Result<ClusterGeometry, StorageError> {
    Ok(bincode::deserialize_from(reader)?)
}

/// Saves a cluster into `dir` under its canonical file name.
pub fn save_cluster_to_dir(cluster: &Cluster, dir: &Path) -> Result<(), StorageError> {
    let path = dir.join(cluster.origin().to_path());
    let file = BufWriter::new(File::create(path)?);
    save_cluster(cluster, file)
}

/// Loads the cluster at `pos` from `dir`. A missing or unreadable file is
/// not fatal: the cluster comes back empty and `Generated`, a warning is
/// logged, and the terrain-content collaborator gets a blank slate.
pub fn load_cluster_from_dir(map: &WorldMap, pos: ClusterPos, dir: &Path) -> Arc<Cluster> {
    let path = dir.join(pos.to_path());
    let loaded = File::open(&path)
        .map_err(StorageError::from)
        .and_then(|file| load_cluster(map, BufReader::new(file)));
    match loaded {
        Ok(cluster) => cluster,
        Err(err) => {
            warn!("cluster {pos} failed to load from {}: {err}", path.display());
            let cluster = map.ensure_cluster(pos);
            cluster.finalize_generation();
            cluster
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::block::BlockShape;

    fn test_map() -> WorldMap {
        WorldMap::new(8, 8, Arc::new(BlockCatalog::new()), None)
    }

    fn populate(cluster: &Cluster) {
        cluster.set_block_relative(0, 0, 0, Block::new(1, BlockShape::Solid));
        cluster.set_block_relative(7, 7, 7, Block::new(2, BlockShape::LowerHalf));
        cluster.set_block_relative(3, 4, 5, Block::new(1, BlockShape::Fluid));
        cluster.finalize_generation();
    }

    #[test]
    fn round_trip_preserves_blocks_across_catalogs() {
        let source = test_map();
        let cluster = source.ensure_cluster(ClusterPos::new(8, -8));
        populate(&cluster);

        // Skew the destination catalog so raw indices cannot line up.
        let dest = test_map();
        for id in 10..20 {
            dest.catalog().add(Block::new(id, BlockShape::Solid));
        }

        let mut bytes = Vec::new();
        save_cluster(&cluster, &mut bytes).unwrap();
        let loaded = load_cluster(&dest, bytes.as_slice()).unwrap();

        for d in 0..8 {
            for v in 0..8 {
                for h in 0..8 {
                    assert_eq!(
                        loaded.get_block_relative(h, v, d),
                        cluster.get_block_relative(h, v, d),
                        "mismatch at ({h}, {v}, {d})"
                    );
                }
            }
        }
        assert_eq!(
            loaded.status(),
            crate::world::cluster::ClusterStatus::Generated
        );
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let source = test_map();
        let cluster = source.ensure_cluster(ClusterPos::new(0, 0));
        populate(&cluster);

        let mut bytes = Vec::new();
        save_cluster(&cluster, &mut bytes).unwrap();

        let dest = WorldMap::new(16, 16, Arc::new(BlockCatalog::new()), None);
        assert!(matches!(
            load_cluster(&dest, bytes.as_slice()),
            Err(StorageError::Mismatch(_))
        ));
    }

    #[test]
    fn corrupt_bytes_are_an_error() {
        let map = test_map();
        let garbage = [0xffu8; 16];
        assert!(load_cluster(&map, garbage.as_slice()).is_err());
    }

    #[test]
    fn directory_round_trip_uses_canonical_names() {
        let dir = tempfile::tempdir().unwrap();
        let source = test_map();
        let cluster = source.ensure_cluster(ClusterPos::new(-8, 16));
        populate(&cluster);
        save_cluster_to_dir(&cluster, dir.path()).unwrap();
        assert!(dir.path().join("cluster_-8_16.bin").exists());

        let dest = test_map();
        let loaded = load_cluster_from_dir(&dest, ClusterPos::new(-8, 16), dir.path());
        assert_eq!(
            loaded.get_block_relative(0, 0, 0),
            Block::new(1, BlockShape::Solid)
        );
    }

    #[test]
    fn geometry_round_trips_through_bincode() {
        let map = test_map();
        let cluster = map.ensure_cluster(ClusterPos::new(0, 0));
        cluster.set_block_relative(2, 2, 2, Block::new(1, BlockShape::Solid));

        let defs = crate::world::block_def::BlockDefRegistry::new();
        defs.register(crate::world::block_def::BlockDef::uniform("stone", 1));
        let culling = crate::mesh::culling::DirectionalCulling;
        let ctx = crate::mesh::builder::MeshContext {
            catalog: map.catalog(),
            defs: &defs,
            culling: &culling,
            light_pos: glam::Vec3::new(0.0, 100.0, 0.0),
            occlusion: None,
        };
        let geometry = crate::mesh::builder::build_cluster_geometry(
            &cluster,
            &crate::mesh::builder::NeighborClusters::none(),
            &ctx,
        );

        let mut bytes = Vec::new();
        save_geometry(&geometry, &mut bytes).unwrap();
        let loaded = load_geometry(bytes.as_slice()).unwrap();
        assert_eq!(loaded, geometry);
    }

    #[test]
    fn missing_file_falls_back_to_an_empty_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let map = test_map();
        let cluster = load_cluster_from_dir(&map, ClusterPos::new(0, 0), dir.path());
        assert_eq!(
            cluster.status(),
            crate::world::cluster::ClusterStatus::Generated
        );
        assert_eq!(cluster.get_block_relative(1, 1, 1), Block::EMPTY);
    }
}

// =============================================================================
// Fichier : image.rs
// Rôle    : Inspection d'une image firmware (UF2 ou binaire brut)
// =============================================================================

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;

use crate::core::worker::Worker;

const UF2_BLOCK_SIZE: usize = 512;
const UF2_MAGIC_START0: u32 = 0x0A32_4655;
const UF2_MAGIC_START1: u32 = 0x9E5D_5157;
const UF2_MAGIC_END: u32 = 0x0AB1_6F30;
const UF2_FLAG_FAMILY_ID: u32 = 0x0000_2000;

/// Lecture par blocs de 64 Kio, multiple de la taille d'un bloc UF2.
const CHUNK_SIZE: usize = 128 * UF2_BLOCK_SIZE;

/// Format détecté.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageFormat {
    Uf2 {
        blocks: u32,
        family_id: Option<u32>,
    },
    Raw,
}

/// Résultat de l'inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub size: u64,
    pub format: ImageFormat,
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.format {
            ImageFormat::Uf2 {
                blocks,
                family_id: Some(family),
            } => write!(f, "UF2, {blocks} blocs, famille 0x{family:08X}, {} octets", self.size),
            ImageFormat::Uf2 { blocks, .. } => {
                write!(f, "UF2, {blocks} blocs, {} octets", self.size)
            }
            ImageFormat::Raw => write!(f, "binaire brut, {} octets", self.size),
        }
    }
}

fn word(block: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&block[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn is_uf2_block(block: &[u8]) -> bool {
    block.len() == UF2_BLOCK_SIZE
        && word(block, 0) == UF2_MAGIC_START0
        && word(block, 4) == UF2_MAGIC_START1
        && word(block, UF2_BLOCK_SIZE - 4) == UF2_MAGIC_END
}

/// Inspecte `path` ; retourne `Ok(None)` si `cancel` a été annulé en cours.
pub fn inspect(path: &Path, cancel: &CancellationToken) -> Result<Option<ImageInfo>> {
    let mut file =
        File::open(path).with_context(|| format!("Impossible d'ouvrir {}", path.display()))?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut size: u64 = 0;
    let mut uf2: Option<(u32, Option<u32>)> = None;
    let mut first = true;

    loop {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let mut filled = 0;
        while filled < buf.len() {
            let n = file
                .read(&mut buf[filled..])
                .with_context(|| format!("Erreur de lecture de {}", path.display()))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            break;
        }
        let chunk = &buf[..filled];

        if first {
            first = false;
            if chunk.len() >= UF2_BLOCK_SIZE && is_uf2_block(&chunk[..UF2_BLOCK_SIZE]) {
                uf2 = Some((0, None));
            }
        }
        if let Some((blocks, family)) = uf2.as_mut() {
            if filled % UF2_BLOCK_SIZE != 0 {
                bail!("{} : taille UF2 non multiple de 512", path.display());
            }
            for block in chunk.chunks(UF2_BLOCK_SIZE) {
                if !is_uf2_block(block) {
                    bail!(
                        "{} : bloc UF2 n°{} invalide",
                        path.display(),
                        *blocks
                    );
                }
                if family.is_none() && word(block, 8) & UF2_FLAG_FAMILY_ID != 0 {
                    *family = Some(word(block, 28));
                }
                *blocks += 1;
            }
        }
        size += filled as u64;
    }

    if size == 0 {
        bail!("{} est vide", path.display());
    }
    let format = match uf2 {
        Some((blocks, family_id)) => ImageFormat::Uf2 { blocks, family_id },
        None => ImageFormat::Raw,
    };
    Ok(Some(ImageInfo {
        path: path.to_path_buf(),
        size,
        format,
    }))
}

/// Vérifie une image en arrière-plan et publie le résultat.
pub struct ImageCheckWorker {
    path: PathBuf,
    tx: async_channel::Sender<ImageInfo>,
}

impl ImageCheckWorker {
    pub fn new(path: PathBuf, tx: async_channel::Sender<ImageInfo>) -> Self {
        Self { path, tx }
    }
}

impl Worker for ImageCheckWorker {
    fn name(&self) -> &str {
        "image"
    }

    fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        if let Some(info) = inspect(&self.path, cancel)? {
            log::info!("Image {} : {info}", self.path.display());
            let _ = self.tx.try_send(info);
        }
        Ok(())
    }
}

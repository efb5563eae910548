// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-eye swap-chain framebuffer pool.
//!
//! The compositor owns the color textures (one swap chain per eye); this
//! module wraps each chain in a ring of framebuffer objects with private
//! depth renderbuffers, one per slot. Rendering binds the current slot,
//! resolves, then advances the ring; the compositor reads the slot that was
//! just resolved while the next frame renders into the following one.
//!
//! With `EXT_multisampled_render_to_texture` available and a sample count
//! above one, color and depth attach through the implicit-resolve
//! multisampled path; otherwise the pool silently falls back to
//! single-sampled attachments. An incomplete framebuffer is a hard error
//! carrying the decoded status.

use log::info;
use thiserror::Error;

use crate::gl::{FramebufferId, FramebufferStatus, GlDriver, RenderbufferId};
use crate::vr::{ColorFormat, SwapChain, SwapChainId, VrError, VrService};

/// Failure to build a framebuffer pool.
#[derive(Debug, Error)]
pub enum FramebufferError {
    /// The service refused the swap-chain allocation.
    #[error("swap chain allocation failed: {0}")]
    SwapChain(#[from] VrError),
    /// A slot's framebuffer object is incomplete.
    #[error("framebuffer incomplete: {status}")]
    Incomplete {
        /// Decoded completeness status.
        status: FramebufferStatus,
    },
}

/// A ring of framebuffer objects over one eye's swap chain.
#[derive(Debug)]
pub struct EyeFramebuffer {
    width: u32,
    height: u32,
    swap_chain: SwapChain,
    depth_buffers: Vec<RenderbufferId>,
    framebuffers: Vec<FramebufferId>,
    index: usize,
}

impl EyeFramebuffer {
    /// Allocates the swap chain and builds one depth renderbuffer and one
    /// framebuffer object per slot.
    pub fn create<G: GlDriver, V: VrService>(
        gl: &mut G,
        vr: &mut V,
        format: ColorFormat,
        width: u32,
        height: u32,
        samples: u32,
    ) -> Result<Self, FramebufferError> {
        let swap_chain = vr.create_swap_chain(format, width, height)?;
        let multisampled = samples > 1 && gl.capabilities().multisampled_render_to_texture;
        info!(
            "creating {}x{} eye framebuffer, {} slots, {}",
            width,
            height,
            swap_chain.len(),
            if multisampled {
                "multisampled render-to-texture"
            } else {
                "single-sampled"
            }
        );

        let mut depth_buffers = Vec::with_capacity(swap_chain.len());
        let mut framebuffers = Vec::with_capacity(swap_chain.len());
        for &texture in &swap_chain.textures {
            gl.set_texture_clamp_linear(texture);

            let depth = gl.create_renderbuffer();
            let depth_samples = if multisampled { samples } else { 0 };
            gl.depth_renderbuffer_storage(depth, depth_samples, width, height);
            depth_buffers.push(depth);

            let framebuffer = gl.create_framebuffer();
            gl.bind_framebuffer(Some(framebuffer));
            if multisampled {
                gl.framebuffer_color_texture_multisample(texture, samples);
            } else {
                gl.framebuffer_color_texture(texture);
            }
            gl.framebuffer_depth_renderbuffer(depth);
            let status = gl.check_framebuffer_status();
            gl.bind_framebuffer(None);
            if status != FramebufferStatus::Complete {
                return Err(FramebufferError::Incomplete { status });
            }
            framebuffers.push(framebuffer);
        }

        Ok(Self {
            width,
            height,
            swap_chain,
            depth_buffers,
            framebuffers,
            index: 0,
        })
    }

    /// Render-target width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Render-target height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of slots in the ring.
    #[must_use]
    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    /// Whether the ring has no slots; never true for a created pool.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }

    /// The slot the next render targets.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The underlying swap chain, for eye layers.
    #[must_use]
    pub fn swap_chain_id(&self) -> SwapChainId {
        self.swap_chain.id
    }

    /// Binds the current slot's framebuffer.
    pub fn set_current<G: GlDriver>(&self, gl: &mut G) {
        gl.bind_framebuffer(Some(self.framebuffers[self.index]));
    }

    /// Binds the default framebuffer.
    pub fn set_none<G: GlDriver>(gl: &mut G) {
        gl.bind_framebuffer(None);
    }

    /// Finishes rendering into the current slot: discard the depth
    /// attachment (the compositor never reads it) and flush so the color
    /// texture is safe to read on the compositor timeline.
    pub fn resolve<G: GlDriver>(&self, gl: &mut G) {
        gl.invalidate_depth_attachment();
        gl.flush();
    }

    /// Steps the ring to the next slot.
    pub fn advance(&mut self) {
        self.index = (self.index + 1) % self.framebuffers.len();
    }

    /// Destroys the framebuffer objects and depth renderbuffers, then the
    /// swap chain.
    pub fn destroy<G: GlDriver, V: VrService>(self, gl: &mut G, vr: &mut V) {
        for framebuffer in self.framebuffers {
            gl.delete_framebuffer(framebuffer);
        }
        for depth in self.depth_buffers {
            gl.delete_renderbuffer(depth);
        }
        vr.destroy_swap_chain(self.swap_chain.id);
    }
}

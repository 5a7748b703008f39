//! Built-in plugins
//!
//! All built-in plugins are postprocess transforms over the HTML fragment.
//! Each one checks its own switch in [`Settings`](crate::settings::Settings),
//! so registering them is always safe and a disabled plugin returns its input
//! unchanged.

mod highlight;
mod images;
mod toc;

pub use highlight::{highlight_code_blocks, highlight_source};
pub use images::{embed_local_images, strip_remote_images};
pub use toc::{insert_toc, TOC_MARKER};

use crate::plugin::PluginDescriptor;
use std::path::Path;

/// Name of the plugin embedding local images
pub const LOCAL_IMAGES: &str = "local-images";
/// Name of the plugin removing remote images
pub const REMOTE_IMAGES: &str = "remote-images";
/// Name of the syntax highlighting plugin
pub const HIGHLIGHT: &str = "highlight";
/// Name of the table of contents plugin
pub const TOC: &str = "toc";

/// Descriptors for every built-in plugin, in the order they should run
///
/// # Parameters
/// * `base_dir` - Directory that relative image paths are resolved against
pub fn builtin(base_dir: &Path) -> Vec<PluginDescriptor> {
    let base_dir = base_dir.to_path_buf();

    vec![
        PluginDescriptor::postprocess(REMOTE_IMAGES, |html, settings| {
            if settings.security.allow_remote_images {
                Ok(html.to_string())
            } else {
                Ok(strip_remote_images(html))
            }
        }),
        PluginDescriptor::postprocess(LOCAL_IMAGES, move |html, _| {
            Ok(embed_local_images(html, &base_dir))
        }),
        PluginDescriptor::postprocess(HIGHLIGHT, |html, settings| {
            if settings.highlight {
                Ok(highlight_code_blocks(html))
            } else {
                Ok(html.to_string())
            }
        }),
        PluginDescriptor::postprocess(TOC, |html, settings| {
            if settings.toc {
                Ok(insert_toc(html))
            } else {
                Ok(html.to_string())
            }
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order() {
        let names: Vec<String> = builtin(Path::new("."))
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec![REMOTE_IMAGES, LOCAL_IMAGES, HIGHLIGHT, TOC]);
    }
}

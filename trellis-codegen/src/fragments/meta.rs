use async_trait::async_trait;
use eyre::Result;
use trellis_core::to_snake_case;
use trellis_ir::{IrMeta, IrPartial, IrPhp};
use trellis_pipeline::{FragmentApply, FragmentArgs, FragmentHelper};

use crate::CodegenHost;

pub const KEY: &str = "ir.meta";

/// Project metadata and PHP settings.
///
/// Registered as an override so a plugin can swap it out wholesale, but only
/// once.
pub fn helper() -> FragmentHelper<CodegenHost> {
    FragmentHelper::new(KEY, MetaFragment)
        .overriding()
        .origin("trellis-codegen")
}

struct MetaFragment;

#[async_trait]
impl FragmentApply<CodegenHost> for MetaFragment {
    async fn apply(&self, mut args: FragmentArgs<'_, CodegenHost>) -> Result<()> {
        let config = &args.input.options.config;
        let source_path = args.input.options.options.source_path.clone();
        let origin = source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| trellis_config::CONFIG_FILE.to_string());

        let meta = IrMeta {
            namespace: config.project.namespace.clone(),
            sanitized_namespace: to_snake_case(&config.project.namespace),
            version: config.project.version,
            origin,
            source_path,
        };
        let php = IrPhp {
            namespace: args.input.build_options.php_namespace.clone(),
            autoload: config.php.autoload.clone(),
            output_dir: args.input.build_options.php_dir.clone(),
        };

        args.reporter
            .debug(format_args!("namespace {} (v{})", meta.namespace, meta.version));
        args.output.assign(IrPartial::meta(meta, php));
        Ok(())
    }
}

//! PHP REST controllers, one per resource, plus a route registrar.

use async_trait::async_trait;
use eyre::Result;
use trellis_core::{File, to_pascal_case};
use trellis_ir::{IrResource, Method, ProjectIr};
use trellis_pipeline::{BuilderApply, BuilderArgs, BuilderHelper, Next};

use super::{EmittedFiles, GENERATED_HEADER};
use crate::{CodegenHost, OutputLayout, Phase, builder::CodeBuilder};

pub const KEY: &str = "builder.php.controllers";

pub fn helper() -> BuilderHelper<CodegenHost> {
    BuilderHelper::new(KEY, PhpControllers).priority(30)
}

struct PhpControllers;

#[async_trait]
impl BuilderApply<CodegenHost> for PhpControllers {
    async fn apply(
        &self,
        args: BuilderArgs<'_, CodegenHost>,
        next: &mut Next<'_, CodegenHost>,
    ) -> Result<()> {
        let files = render(args.artifact, args.input.build_options);

        if args.context.phase == Phase::Check {
            args.reporter.info(format_args!(
                "check: {} PHP files would be generated",
                files.len()
            ));
            // Nothing downstream may stage files during a check.
            return Ok(());
        }

        for file in files {
            args.run
                .side_table
                .with(|emitted: &mut EmittedFiles| emitted.push(file.path()));
            args.context.stage(file)?;
        }
        next.run(args.artifact).await
    }
}

pub(crate) fn render(ir: &ProjectIr, layout: &OutputLayout) -> Vec<File> {
    let rest_dir = layout.php_dir.join("Rest");
    let mut files: Vec<File> = ir
        .resources
        .iter()
        .map(|resource| {
            File::new(
                rest_dir.join(format!("{}.php", controller_class(resource))),
                render_controller(ir, resource, &layout.php_namespace),
            )
        })
        .collect();
    files.push(File::new(
        rest_dir.join("Routes.php"),
        render_routes(ir, &layout.php_namespace),
    ));
    files
}

fn controller_class(resource: &IrResource) -> String {
    format!("{}Controller", to_pascal_case(&resource.name))
}

fn rest_namespace(ir: &ProjectIr) -> String {
    format!("{}/v{}", ir.meta.namespace, ir.meta.version)
}

fn handler_name(method: Method) -> String {
    format!("handle_{method}")
}

fn item_route(route: &str) -> String {
    format!("{route}/(?P<id>\\d+)")
}

pub(crate) fn render_controller(ir: &ProjectIr, resource: &IrResource, namespace: &str) -> String {
    let class = controller_class(resource);
    let rest_namespace = rest_namespace(ir);
    let capability = ir.capability_for(resource);
    let schema_path = ir
        .schema(&resource.schema)
        .map(|schema| schema.path.display().to_string())
        .unwrap_or_default();

    CodeBuilder::php()
        .line("<?php")
        .line(GENERATED_HEADER)
        .blank()
        .line("declare(strict_types=1);")
        .blank()
        .line(&format!("namespace {namespace}\\Rest;"))
        .blank()
        .line(&format!("final class {class}"))
        .block_with_close("{", "}", |b| {
            b.line(&format!("public const SCHEMA = '{schema_path}';"))
                .line(&format!("public const CAPABILITY = '{capability}';"))
                .each(resource.cache_ttl, |b, ttl| {
                    b.line(&format!("public const CACHE_TTL = {ttl};"))
                })
                .blank()
                .line("public function register_routes(): void")
                .block_with_close("{", "}", |b| {
                    b.each(&resource.methods, |b, method| {
                        let route = if method.takes_id() {
                            item_route(&resource.route)
                        } else {
                            resource.route.clone()
                        };
                        b.block_with_close(
                            &format!("register_rest_route('{rest_namespace}', '{route}', ["),
                            "]);",
                            |b| {
                                b.line(&format!("'methods' => '{}',", method.http_verb()))
                                    .line(&format!(
                                        "'callback' => [$this, '{}'],",
                                        handler_name(*method)
                                    ))
                                    .line("'permission_callback' => [$this, 'can_access'],")
                            },
                        )
                    })
                })
                .blank()
                .line("public function can_access(): bool")
                .block_with_close("{", "}", |b| {
                    b.line("return current_user_can(self::CAPABILITY);")
                })
                .each(&resource.methods, |b, method| {
                    b.blank()
                        .line(&format!(
                            "public function {}(\\WP_REST_Request $request): \\WP_REST_Response",
                            handler_name(*method)
                        ))
                        .block_with_close("{", "}", |b| {
                            b.line("return new \\WP_REST_Response(null, 501);")
                        })
                })
        })
        .build()
}

fn render_routes(ir: &ProjectIr, namespace: &str) -> String {
    CodeBuilder::php()
        .line("<?php")
        .line(GENERATED_HEADER)
        .blank()
        .line("declare(strict_types=1);")
        .blank()
        .line(&format!("namespace {namespace}\\Rest;"))
        .blank()
        .line("final class Routes")
        .block_with_close("{", "}", |b| {
            b.line("public static function register(): void")
                .block_with_close("{", "}", |b| {
                    b.each(&ir.resources, |b, resource| {
                        b.line(&format!(
                            "(new {}())->register_routes();",
                            controller_class(resource)
                        ))
                    })
                })
        })
        .build()
}

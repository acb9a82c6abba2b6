//! TypeScript REST clients, one module per resource plus an index.

use trellis_core::{File, to_camel_case, to_kebab_case, to_pascal_case};
use trellis_ir::{IrResource, Method, ProjectIr};
use trellis_pipeline::BuilderHelper;

use super::{EmittedFiles, GENERATED_HEADER};
use crate::{CodegenHost, OutputLayout, builder::CodeBuilder};

pub const KEY: &str = "builder.ts.clients";

pub fn helper() -> BuilderHelper<CodegenHost> {
    BuilderHelper::<CodegenHost>::from_fn(KEY, |args| {
        let files = render(args.artifact, args.input.build_options);
        args.reporter
            .debug(format_args!("staging {} TypeScript modules", files.len()));
        for file in files {
            args.run
                .side_table
                .with(|emitted: &mut EmittedFiles| emitted.push(file.path()));
            args.context.stage(file)?;
        }
        Ok(())
    })
    .priority(20)
}

pub(crate) fn render(ir: &ProjectIr, layout: &OutputLayout) -> Vec<File> {
    let dir = &layout.ts_dir;
    let mut files = vec![File::new(dir.join("fetcher.ts"), render_fetcher())];
    files.extend(ir.resources.iter().map(|resource| {
        File::new(
            dir.join(format!("{}.ts", to_kebab_case(&resource.name))),
            render_client(resource),
        )
    }));
    files.push(File::new(dir.join("index.ts"), render_index(ir)));
    files
        .into_iter()
        .map(|file| file.with_header(GENERATED_HEADER))
        .collect()
}

fn render_fetcher() -> String {
    CodeBuilder::typescript()
        .block_with_close("export interface Request {", "}", |b| {
            b.line("path: string;")
                .line("method: 'GET' | 'POST' | 'PUT' | 'DELETE';")
                .line("data?: unknown;")
        })
        .blank()
        .line("export type Fetcher = <T>(request: Request) => Promise<T>;")
        .build()
}

fn signature(method: Method) -> &'static str {
    match method {
        Method::List => "list(): Promise<unknown[]>;",
        Method::Get => "get(id: number): Promise<unknown>;",
        Method::Create => "create(data: unknown): Promise<unknown>;",
        Method::Update => "update(id: number, data: unknown): Promise<unknown>;",
        Method::Remove => "remove(id: number): Promise<void>;",
    }
}

fn implementation(method: Method, route: &str) -> String {
    let verb = method.http_verb();
    let item = format!("`${{{route}}}/${{id}}`");
    match method {
        Method::List => format!("list: () => fetcher({{ path: {route}, method: '{verb}' }}),"),
        Method::Get => format!("get: (id) => fetcher({{ path: {item}, method: '{verb}' }}),"),
        Method::Create => {
            format!("create: (data) => fetcher({{ path: {route}, method: '{verb}', data }}),")
        }
        Method::Update => {
            format!("update: (id, data) => fetcher({{ path: {item}, method: '{verb}', data }}),")
        }
        Method::Remove => format!("remove: (id) => fetcher({{ path: {item}, method: '{verb}' }}),"),
    }
}

pub(crate) fn render_client(resource: &IrResource) -> String {
    let pascal = to_pascal_case(&resource.name);
    let route = format!("{}Route", to_camel_case(&resource.name));

    CodeBuilder::typescript()
        .line("import type { Fetcher } from './fetcher';")
        .blank()
        .line(&format!("export const {route} = '{}';", resource.route))
        .blank()
        .block_with_close(&format!("export interface {pascal}Client {{"), "}", |b| {
            b.each(&resource.methods, |b, method| b.line(signature(*method)))
        })
        .blank()
        .block_with_close(
            &format!("export function create{pascal}Client(fetcher: Fetcher): {pascal}Client {{"),
            "}",
            |b| {
                b.block_with_close("return {", "};", |b| {
                    b.each(&resource.methods, |b, method| {
                        b.line(&implementation(*method, &route))
                    })
                })
            },
        )
        .build()
}

fn render_index(ir: &ProjectIr) -> String {
    CodeBuilder::typescript()
        .line("export type { Fetcher, Request } from './fetcher';")
        .each(&ir.resources, |b, resource| {
            b.line(&format!(
                "export * from './{}';",
                to_kebab_case(&resource.name)
            ))
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::fixtures;

    #[test]
    fn test_implementation_paths() {
        assert_eq!(
            implementation(Method::Get, "postRoute"),
            "get: (id) => fetcher({ path: `${postRoute}/${id}`, method: 'GET' }),"
        );
        assert_eq!(
            implementation(Method::Create, "postRoute"),
            "create: (data) => fetcher({ path: postRoute, method: 'POST', data }),"
        );
    }

    #[test]
    fn test_render_client() {
        let ir = fixtures::ir();

        insta::assert_snapshot!(render_client(&ir.resources[0]), @r"
        import type { Fetcher } from './fetcher';

        export const blogPostRoute = '/posts';

        export interface BlogPostClient {
          list(): Promise<unknown[]>;
          get(id: number): Promise<unknown>;
        }

        export function createBlogPostClient(fetcher: Fetcher): BlogPostClient {
          return {
            list: () => fetcher({ path: blogPostRoute, method: 'GET' }),
            get: (id) => fetcher({ path: `${blogPostRoute}/${id}`, method: 'GET' }),
          };
        }
        ");
    }

    #[test]
    fn test_render_headers_and_index() {
        let files = render(&fixtures::ir(), &fixtures::layout());
        let names: Vec<String> = files
            .iter()
            .map(|file| file.path().display().to_string())
            .collect();

        assert_eq!(
            names,
            [
                ".generated/ts/fetcher.ts",
                ".generated/ts/blog-post.ts",
                ".generated/ts/index.ts",
            ]
        );
        assert!(files.iter().all(|file| file.render().starts_with(GENERATED_HEADER)));
        assert!(files[2].content().contains("export * from './blog-post';"));
    }
}

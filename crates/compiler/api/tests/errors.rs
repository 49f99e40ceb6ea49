use jolt_ast::{
    CompilationUnit, ForeignExpr, ForeignFn, ForeignStmt, MethodBody, MethodDecl, NameRef,
    Primitive, SourceMap, Span, TypeDecl,
};
use jolt_compiler_api::{Compilation, Diagnostic, Dotfile, LoweringConfig, Program};
use jolt_compiler_frontend::{Field, FieldFlags, Method, MethodFlags, TypeDef};
use similar_asserts::assert_eq;

const SOURCE: &str = "class Main {
  static native long get() /*-{ return Math.max(@Main::MISSING, @Main::big); }-*/;
}
";

#[test]
fn foreign_reference_errors() {
    let mut sources = SourceMap::new();
    let file = sources.push("Main.java", SOURCE);
    let (program, unit) = foreign_fixture(file);

    let compilation = Compilation::builder()
        .units(&[unit])
        .program(program)
        .sources(&sources)
        .lower()
        .unwrap();

    let diagnostics = compilation.diagnostics();
    assert!(diagnostics.has_fatal_errors());
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.dump(&sources).is_ok());

    insta::assert_snapshot!(DisplayDiagnostics(diagnostics.to_vec(), &sources), @r"
    At Main.java:2:65
      static native long get() /*-{ return Math.max(@Main::MISSING, @Main::big); }-*/;
                                                                    ^^^^^^^^^^
    [UNSAFE_LONG] `Main.big` uses the type `long`, which is not safe to access in foreign code

    At Main.java:2:49
      static native long get() /*-{ return Math.max(@Main::MISSING, @Main::big); }-*/;
                                                    ^^^^^^^^^^^^^^
    [UNRESOLVED_MEMBER] unable to resolve field `MISSING` in `Main`
    ");
    insta::assert_snapshot!(diagnostics, @r"
    `Main.big` uses the type `long`, which is not safe to access in foreign code
    unable to resolve field `MISSING` in `Main`
    ");
}

#[test]
fn options_from_dotfile() {
    let sources = SourceMap::new();
    let program = Program::with_default_types();
    let dotfile = Dotfile {
        lowering: LoweringConfig {
            enable_assertions: Some(true),
            class_metadata: Some(false),
            ..Default::default()
        },
    };

    let compilation = Compilation::builder()
        .units(&[])
        .program(program)
        .sources(&sources)
        .options(dotfile.into_options())
        .lower()
        .unwrap();
    assert!(compilation.diagnostics().is_empty());

    let program = compilation.program();
    let well_known = program.well_known();
    insta::assert_snapshot!(program.display_method(well_known.class_desired_assertion_status), @r"
    boolean Class.desiredAssertionStatus() {
      return true;
    }
    ");
    insta::assert_snapshot!(program.display_method(well_known.class_is_metadata_enabled), @r"
    static boolean Class.isClassMetadataEnabled() {
      return false;
    }
    ");
}

fn foreign_fixture(file: jolt_ast::FileId) -> (Program<'static>, CompilationUnit<'static>) {
    let mut program = Program::with_default_types();
    let object = program.well_known().object;
    let main = program.add_type(TypeDef::builder().name("Main").super_class(object).build());
    program.add_field(
        Field::builder()
            .name("big")
            .parent(main)
            .ty(Primitive::Long.into())
            .flags(FieldFlags::new().with_is_static(true))
            .build(),
    );
    let get = program.add_method(
        Method::builder()
            .name("get")
            .parent(main)
            .return_type(Primitive::Long.into())
            .flags(MethodFlags::new().with_is_static(true).with_is_foreign(true))
            .build(),
    );

    let name_ref = |ident: &'static str| {
        let start = u32::try_from(SOURCE.find(ident).unwrap()).unwrap();
        let end = start + u32::try_from(ident.len()).unwrap();
        ForeignExpr::NameRef(NameRef {
            ident: ident.into(),
            qualifier: None,
            span: Span::new(start, end, file),
        })
    };
    let body = ForeignStmt::Return(Some(ForeignExpr::Call {
        callee: Box::new(ForeignExpr::Verbatim("Math.max".into())),
        args: vec![name_ref("@Main::MISSING"), name_ref("@Main::big")],
    }));
    let span = Span::new(0, u32::try_from(SOURCE.len()).unwrap(), file);
    let method = MethodDecl {
        id: get,
        body: MethodBody::Foreign(ForeignFn {
            params: vec![],
            body: vec![body],
            span,
        }),
        ctor_call: None,
        span,
    };
    let unit = CompilationUnit {
        file,
        types: vec![TypeDecl {
            id: main,
            outer_instances: vec![],
            outer_locals: vec![],
            members: vec![],
            methods: vec![method],
            bridges: vec![],
            span,
        }],
    };
    (program, unit)
}

struct DisplayDiagnostics<'ctx>(Vec<Diagnostic<'ctx>>, &'ctx SourceMap);

impl std::fmt::Display for DisplayDiagnostics<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0
            .iter()
            .try_for_each(|diagnostic| writeln!(f, "{}", diagnostic.display(self.1).unwrap()))
    }
}

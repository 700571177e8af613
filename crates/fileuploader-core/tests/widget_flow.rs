//! Integration test: drive a widget through both upload strategies with
//! in-memory transports and forms.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::RefCell;
use std::rc::Rc;

use fileuploader_core::{
    Capabilities, CompletedRequest, DropPolicy, ErrorKind, FileInfo, FormControls,
    LegacyUploadHandler, OutgoingRequest, RequestId, Strategy, SubmitDecision, Transport,
    TransportOutcome, UploadHandler, UploadStatus, UploadWidget, WidgetError, WidgetHooks,
    WidgetOptions, XhrUploadHandler,
};

#[derive(Default)]
struct Wire {
    sent: Vec<(RequestId, OutgoingRequest)>,
}

impl Transport for Wire {
    type File = FileInfo;
    type Error = std::convert::Infallible;

    fn send(
        &mut self,
        id: RequestId,
        request: &OutgoingRequest,
        _file: &FileInfo,
    ) -> Result<(), Self::Error> {
        self.sent.push((id, request.clone()));
        Ok(())
    }
}

struct Form {
    path: String,
    enabled: bool,
}

impl FormControls for Form {
    fn is_complete(&self) -> bool {
        true
    }

    fn selected_path(&self) -> String {
        self.path.clone()
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

#[derive(Default)]
struct Seen {
    completed: Vec<Vec<CompletedRequest>>,
    errors: Vec<Vec<WidgetError>>,
    successes: Vec<String>,
}

fn recording_hooks() -> (WidgetHooks, Rc<RefCell<Seen>>) {
    let seen = Rc::new(RefCell::new(Seen::default()));
    let (a, b, c) = (Rc::clone(&seen), Rc::clone(&seen), Rc::clone(&seen));
    let hooks = WidgetHooks::new()
        .on_complete(move |batch| a.borrow_mut().completed.push(batch.to_vec()))
        .on_error(move |errors| b.borrow_mut().errors.push(errors.to_vec()))
        .on_success(move |name, _| c.borrow_mut().successes.push(name.to_owned()));
    (hooks, seen)
}

fn options() -> WidgetOptions {
    WidgetOptions::from_json(
        r#"{
            "action": "/upload",
            "params": {"album": "holidays"},
            "allowedExtensions": ["jpg", "png"],
            "maxFilesDropped": 3
        }"#,
    )
    .expect("options parse")
}

#[test]
fn xhr_batch_out_of_order() {
    let (hooks, seen) = recording_hooks();
    let widget = UploadWidget::new(options(), Capabilities::modern(), hooks).unwrap();
    assert_eq!(widget.strategy(), Some(Strategy::Xhr));

    let mut handler = XhrUploadHandler::new(
        widget.handler_config(),
        widget.handler_hooks(),
        Wire::default(),
        DropPolicy::TypeList,
    );
    assert!(handler.initialize());

    let started = handler.drop_files(vec![
        FileInfo::new("beach.JPG", 10_000),
        FileInfo::new("notes.txt", 12),
        FileInfo::new("sunset.png", 20_000),
    ]);
    assert_eq!(started, 2);
    assert_eq!(widget.in_flight(), 2);
    assert!(widget.leave_warning().is_some());

    let sent: Vec<_> = handler.transport().sent.clone();
    assert_eq!(sent[0].1.url, "/upload?album=holidays&file=beach.JPG");

    handler.on_upload_finished(
        sent[1].0,
        TransportOutcome::Loaded {
            body: String::from(r#"{"status":"error","reason":"too dark"}"#),
        },
    );
    assert!(seen.borrow().completed.is_empty());
    handler.on_upload_finished(
        sent[0].0,
        TransportOutcome::Loaded {
            body: String::from(r#"{"status":"ok"}"#),
        },
    );

    let seen = seen.borrow();
    assert_eq!(seen.completed.len(), 1);
    assert_eq!(seen.completed[0].len(), 3);
    assert_eq!(seen.successes, vec![String::from("beach.JPG")]);

    let kinds: Vec<_> = seen.errors[0].iter().map(|e| e.record.kind).collect();
    assert_eq!(kinds, vec![ErrorKind::ExtensionError, ErrorKind::Failure]);
    assert_eq!(
        seen.errors[0][0].message,
        "<b>notes.txt</b> has invalid extension. Only jpg, png are allowed."
    );

    assert_eq!(widget.in_flight(), 0);
    assert!(widget.leave_warning().is_none());
    assert_eq!(widget.file_status(sent[0].0), Some(UploadStatus::Success));
    assert_eq!(widget.file_status(sent[1].0), Some(UploadStatus::Error));
}

#[test]
fn dropping_four_files_over_limit_uploads_nothing() {
    let (hooks, seen) = recording_hooks();
    let widget = UploadWidget::new(options(), Capabilities::modern(), hooks).unwrap();
    let mut handler = XhrUploadHandler::new(
        widget.handler_config(),
        widget.handler_hooks(),
        Wire::default(),
        DropPolicy::WebKit,
    );

    let files = (0..4).map(|i| FileInfo::new(format!("{i}.png"), 1)).collect();
    assert_eq!(handler.drop_files(files), 0);
    assert!(handler.transport().sent.is_empty());

    let seen = seen.borrow();
    assert_eq!(seen.errors.len(), 1);
    assert_eq!(seen.errors[0].len(), 1);
    assert_eq!(seen.errors[0][0].record.kind, ErrorKind::MaxFilesDropped);
    assert_eq!(seen.errors[0][0].message, "You can upload maximum <b>3</b> files");
    assert_eq!(widget.in_flight(), 0);
}

#[test]
fn legacy_round_trip() {
    let (hooks, seen) = recording_hooks();
    let old_browser = Capabilities {
        multiple_file_input: false,
        ..Capabilities::modern()
    };
    let widget = UploadWidget::new(options(), old_browser, hooks).unwrap();
    assert_eq!(widget.strategy(), Some(Strategy::Legacy));

    let form = Form {
        path: String::from(r"C:\fakepath\beach.jpg"),
        enabled: true,
    };
    let mut handler = LegacyUploadHandler::new(widget.handler_config(), widget.handler_hooks(), form);
    assert!(handler.initialize());

    assert_eq!(handler.before_submit(), SubmitDecision::Proceed);
    assert!(!handler.controls().enabled);
    assert_eq!(widget.in_flight(), 1);

    handler.on_transport_error(Some("Service Unavailable"));
    assert!(handler.controls().enabled);

    let seen = seen.borrow();
    assert_eq!(seen.completed[0][0].file_name, "beach.jpg");
    assert_eq!(seen.errors[0][0].record.kind, ErrorKind::Exception);
    assert_eq!(seen.errors[0][0].message, "<b>beach.jpg</b> could not be uploaded");
    assert_eq!(widget.in_flight(), 0);
}

#[test]
fn options_built_with_struct_update() {
    let options = WidgetOptions {
        action: Some(String::from("/upload")),
        max_files_dropped: 1,
        ..WidgetOptions::default()
    };
    let (hooks, seen) = recording_hooks();
    let widget = UploadWidget::new(options, Capabilities::modern(), hooks).unwrap();
    let mut handler = XhrUploadHandler::new(
        widget.handler_config(),
        widget.handler_hooks(),
        Wire::default(),
        DropPolicy::TypeList,
    );

    let files = vec![FileInfo::new("a.png", 1), FileInfo::new("b.png", 1)];
    assert_eq!(handler.drop_files(files), 0);
    assert_eq!(seen.borrow().errors[0][0].message, "You can upload maximum <b>1</b> files");
}
